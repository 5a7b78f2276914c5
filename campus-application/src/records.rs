//! 校务记录集
//!
//! 五类记录（院系/教师/课程/学生/选课）与一条教师↔课程关联边，
//! 以及它们的删除依赖声明。标识一律为 `i64` 包装的强类型 id；
//! 补丁结构的每个字段都是可选项，未给出的字段不参与写入，
//! 可空外键以双层 `Option` 区分“不动”与“置空”。
use campus_domain::entity::{Link, Record};
use campus_domain::store::{DependencyRule, DependencyRules, EdgeCascade, OnDelete};
use campus_macros::{entity, entity_id};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[entity_id]
pub struct DepartmentId(i64);

#[entity_id]
pub struct InstructorId(i64);

#[entity_id]
pub struct CourseId(i64);

#[entity_id]
pub struct StudentId(i64);

#[entity_id]
pub struct EnrollmentId(i64);

/// 院系；`administrator` 为可空的教师引用
#[entity(id = DepartmentId)]
pub struct Department {
    pub name: String,
    pub budget: i64,
    pub start_date: NaiveDate,
    pub administrator: Option<InstructorId>,
}

impl Record for Department {
    const KIND: &'static str = "department";
    type Patch = DepartmentPatch;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepartmentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// `Some(None)` 置空，`None` 不动
    #[serde(skip_serializing_if = "Option::is_none")]
    pub administrator: Option<Option<InstructorId>>,
}

#[entity(id = InstructorId)]
pub struct Instructor {
    pub name: String,
    pub hired_on: Option<NaiveDate>,
}

impl Record for Instructor {
    const KIND: &'static str = "instructor";
    type Patch = InstructorPatch;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstructorPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// 课程；`department_id` 为可空的院系引用
#[entity(id = CourseId)]
pub struct Course {
    pub title: String,
    pub credits: u32,
    pub department_id: Option<DepartmentId>,
}

impl Record for Course {
    const KIND: &'static str = "course";
    type Patch = CoursePatch;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoursePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<Option<DepartmentId>>,
}

#[entity(id = StudentId)]
pub struct Student {
    pub name: String,
    pub enrolled_on: Option<NaiveDate>,
}

impl Record for Student {
    const KIND: &'static str = "student";
    type Patch = StudentPatch;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// 选课记录：学生与课程的带属性关联（成绩），自身有标识与版本
#[entity(id = EnrollmentId)]
pub struct Enrollment {
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub grade: Option<String>,
}

impl Record for Enrollment {
    const KIND: &'static str = "enrollment";
    type Patch = EnrollmentPatch;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrollmentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<Option<String>>,
}

/// 教师↔课程授课关联（无属性，多对多）
pub struct Teaches;

impl Link for Teaches {
    const EDGE: &'static str = "instructor_course";
    type Left = Instructor;
    type Right = Course;
}

/// 全部删除依赖声明
///
/// - 教师被院系 `administrator` 引用时不可删除；
/// - 院系被课程 `department_id` 引用时不可删除；
/// - 课程被选课记录引用时不可删除；
/// - 删除学生时其选课记录随之级联删除；
/// - 删除教师或课程时清理授课关联对。
pub fn dependency_rules() -> DependencyRules {
    DependencyRules::new()
        .declare(
            DependencyRule::builder()
                .owner_kind(Instructor::KIND)
                .dependent_kind(Department::KIND)
                .via_field("administrator")
                .on_delete(OnDelete::Block)
                .build(),
        )
        .declare(
            DependencyRule::builder()
                .owner_kind(Department::KIND)
                .dependent_kind(Course::KIND)
                .via_field("department_id")
                .on_delete(OnDelete::Block)
                .build(),
        )
        .declare(
            DependencyRule::builder()
                .owner_kind(Course::KIND)
                .dependent_kind(Enrollment::KIND)
                .via_field("course_id")
                .on_delete(OnDelete::Block)
                .build(),
        )
        .declare(
            DependencyRule::builder()
                .owner_kind(Student::KIND)
                .dependent_kind(Enrollment::KIND)
                .via_field("student_id")
                .on_delete(OnDelete::Cascade)
                .build(),
        )
        .declare_edge(
            EdgeCascade::builder()
                .edge(Teaches::EDGE)
                .left_kind(Instructor::KIND)
                .right_kind(Course::KIND)
                .build(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_domain::entity::Entity;

    // 强类型 id 在 JSON 中是裸数值，与依赖计数的字段匹配约定一致
    #[test]
    fn administrator_serializes_as_bare_number() {
        let mut dept = Department::new(DepartmentId::new(7));
        dept.administrator = Some(InstructorId::new(9));

        let json = serde_json::to_value(&dept).unwrap();
        assert_eq!(json["administrator"], 9);
        assert_eq!(json["id"], 7);
    }

    // 未给出的补丁字段不出现在序列化结果里
    #[test]
    fn patch_omits_untouched_fields() {
        let patch = DepartmentPatch {
            budget: Some(1200),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();

        assert_eq!(json, serde_json::json!({ "budget": 1200 }));
    }

    // 双层 Option：置空外键序列化为显式 null
    #[test]
    fn clearing_nullable_reference_serializes_null() {
        let patch = DepartmentPatch {
            administrator: Some(None),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();

        assert_eq!(json, serde_json::json!({ "administrator": null }));
    }

    #[test]
    fn rules_cover_every_declared_owner() {
        let rules = dependency_rules();
        assert_eq!(rules.for_owner(Instructor::KIND).count(), 1);
        assert_eq!(rules.for_owner(Student::KIND).count(), 1);
        assert_eq!(rules.edges_of(Instructor::KIND).len(), 1);
        assert_eq!(rules.edges_of(Course::KIND).len(), 1);
    }
}
