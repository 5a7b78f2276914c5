//! 外部命令与处理器
//!
//! 每条命令携带目标标识与显式的期望版本（关联替换除外，它按集合语义
//! 对账、无版本参数）。处理器只做翻译：把命令参数交给变更编排器，
//! 把编排器的终态值装入回执。冲突、阻断与不存在都在回执里，
//! 错误通道只留给基础设施故障。
use crate::{
    command::Command,
    command_handler::CommandHandler,
    context::AppContext,
    dto::{LinkReply, MutationReply},
    error::AppError,
    records::{
        CourseId, Department, DepartmentId, DepartmentPatch, Instructor, InstructorId, Student,
        StudentId, Teaches,
    },
};
use async_trait::async_trait;
use campus_domain::mutation::MutationRoot;
use campus_domain::store::StorageEngine;
use campus_domain::value_object::Version;
use std::collections::BTreeSet;
use std::sync::Arc;

/// 更新院系标量字段
#[derive(Debug, Clone)]
pub struct UpdateDepartment {
    pub id: DepartmentId,
    pub patch: DepartmentPatch,
    pub expected_version: usize,
}

impl Command for UpdateDepartment {
    const NAME: &'static str = "department.update";
    type Output = MutationReply<Department>;
}

pub struct UpdateDepartmentHandler<E> {
    root: Arc<MutationRoot<E>>,
}

impl<E> UpdateDepartmentHandler<E> {
    pub fn new(root: Arc<MutationRoot<E>>) -> Self {
        Self { root }
    }
}

#[async_trait]
impl<E> CommandHandler<UpdateDepartment> for UpdateDepartmentHandler<E>
where
    E: StorageEngine + 'static,
{
    async fn handle(
        &self,
        ctx: &AppContext,
        cmd: UpdateDepartment,
    ) -> Result<MutationReply<Department>, AppError> {
        tracing::debug!(request_id = %ctx.request_id, command = UpdateDepartment::NAME, id = %cmd.id);
        let outcome = self
            .root
            .update::<Department>(&cmd.id, &cmd.patch, Version::from_value(cmd.expected_version))
            .await?;
        Ok(MutationReply::from_update(&cmd.id, outcome))
    }
}

/// 整体替换某教师的授课课程集合
#[derive(Debug, Clone)]
pub struct ReplaceInstructorCourses {
    pub instructor_id: InstructorId,
    pub course_ids: BTreeSet<CourseId>,
}

impl Command for ReplaceInstructorCourses {
    const NAME: &'static str = "instructor.replace_courses";
    type Output = LinkReply<CourseId>;
}

pub struct ReplaceInstructorCoursesHandler<E> {
    root: Arc<MutationRoot<E>>,
}

impl<E> ReplaceInstructorCoursesHandler<E> {
    pub fn new(root: Arc<MutationRoot<E>>) -> Self {
        Self { root }
    }
}

#[async_trait]
impl<E> CommandHandler<ReplaceInstructorCourses> for ReplaceInstructorCoursesHandler<E>
where
    E: StorageEngine + 'static,
{
    async fn handle(
        &self,
        ctx: &AppContext,
        cmd: ReplaceInstructorCourses,
    ) -> Result<LinkReply<CourseId>, AppError> {
        tracing::debug!(
            request_id = %ctx.request_id,
            command = ReplaceInstructorCourses::NAME,
            id = %cmd.instructor_id,
        );
        let outcome = self
            .root
            .replace_links::<Teaches>(&cmd.instructor_id, &cmd.course_ids)
            .await?;
        Ok(LinkReply::from_reconcile(&cmd.instructor_id, outcome))
    }
}

/// 删除教师（受阻断规则与期望版本双重约束）
#[derive(Debug, Clone)]
pub struct DeleteInstructor {
    pub id: InstructorId,
    pub expected_version: usize,
}

impl Command for DeleteInstructor {
    const NAME: &'static str = "instructor.delete";
    type Output = MutationReply<Instructor>;
}

pub struct DeleteInstructorHandler<E> {
    root: Arc<MutationRoot<E>>,
}

impl<E> DeleteInstructorHandler<E> {
    pub fn new(root: Arc<MutationRoot<E>>) -> Self {
        Self { root }
    }
}

#[async_trait]
impl<E> CommandHandler<DeleteInstructor> for DeleteInstructorHandler<E>
where
    E: StorageEngine + 'static,
{
    async fn handle(
        &self,
        ctx: &AppContext,
        cmd: DeleteInstructor,
    ) -> Result<MutationReply<Instructor>, AppError> {
        tracing::debug!(request_id = %ctx.request_id, command = DeleteInstructor::NAME, id = %cmd.id);
        let outcome = self
            .root
            .delete::<Instructor>(&cmd.id, Version::from_value(cmd.expected_version))
            .await?;
        Ok(MutationReply::from_delete(&cmd.id, outcome))
    }
}

/// 删除学生；其选课记录按声明级联删除
#[derive(Debug, Clone)]
pub struct DeleteStudent {
    pub id: StudentId,
    pub expected_version: usize,
}

impl Command for DeleteStudent {
    const NAME: &'static str = "student.delete";
    type Output = MutationReply<Student>;
}

pub struct DeleteStudentHandler<E> {
    root: Arc<MutationRoot<E>>,
}

impl<E> DeleteStudentHandler<E> {
    pub fn new(root: Arc<MutationRoot<E>>) -> Self {
        Self { root }
    }
}

#[async_trait]
impl<E> CommandHandler<DeleteStudent> for DeleteStudentHandler<E>
where
    E: StorageEngine + 'static,
{
    async fn handle(
        &self,
        ctx: &AppContext,
        cmd: DeleteStudent,
    ) -> Result<MutationReply<Student>, AppError> {
        tracing::debug!(request_id = %ctx.request_id, command = DeleteStudent::NAME, id = %cmd.id);
        let outcome = self
            .root
            .delete::<Student>(&cmd.id, Version::from_value(cmd.expected_version))
            .await?;
        Ok(MutationReply::from_delete(&cmd.id, outcome))
    }
}
