//! 值对象（Value Object）
//!
//! 无标识、以值相等为准的对象，用于封装不可变的概念性值与校验逻辑。
//!

use std::fmt;

use campus_macros::value_object;

/// 值对象抽象
pub trait ValueObject {
    /// 业务校验失败时的错误类型
    type Error;

    /// 创建值对象时进行验证
    fn validate(&self) -> Result<(), Self::Error>;
}

/// 版本号（用于乐观锁和并发控制）
///
/// 记录的持久化版本：创建时落库为 1，此后每次成功变更在同一条件写内 +1，
/// 单调递增、不回退、不复用。0 表示"尚未持久化"。
///
/// # 示例
///
/// ```
/// use campus_domain::value_object::Version;
///
/// let v0 = Version::new();
/// assert_eq!(v0.value(), 0);
/// assert!(v0.is_new());
///
/// let v1 = Version::first();
/// assert_eq!(v1.value(), 1);
/// assert!(v1.is_created());
///
/// assert!(v1.next() > v1);
/// ```
// 使用 value_object 宏提供基础的派生（Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq）
// 手动添加 Version 特有的派生（Copy, PartialOrd, Ord, Hash）
#[value_object]
#[derive(Copy, PartialOrd, Ord, Hash)]
pub struct Version(usize);

impl Version {
    /// 创建初始版本（版本号为 0，尚未持久化）
    pub const fn new() -> Self {
        Self(0)
    }

    /// 创建首个持久化版本（版本号为 1）
    ///
    /// # 示例
    ///
    /// ```
    /// use campus_domain::value_object::Version;
    ///
    /// assert_eq!(Version::first(), Version::new().next());
    /// ```
    pub const fn first() -> Self {
        Self(1)
    }

    /// 从值创建版本号
    pub const fn from_value(value: usize) -> Self {
        Self(value)
    }

    /// 获取下一个版本号
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// 获取版本号的值
    pub const fn value(&self) -> usize {
        self.0
    }

    /// 检查是否为初始版本（尚未持久化）
    pub fn is_new(&self) -> bool {
        self.0 == 0
    }

    /// 检查记录是否已创建（版本大于零）
    ///
    /// 调用方提交的期望版本必须满足该条件，否则属于调用契约违例，
    /// 在触达存储之前即被拒绝。
    pub fn is_created(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<usize> for Version {
    fn from(value: usize) -> Self {
        Self::from_value(value)
    }
}

impl From<Version> for usize {
    fn from(version: Version) -> Self {
        version.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 测试初始版本创建
    #[test]
    fn test_version_new() {
        let v = Version::new();
        assert_eq!(v.value(), 0);
        assert!(v.is_new());
        assert!(!v.is_created());
    }

    // 测试首个持久化版本
    #[test]
    fn test_version_first() {
        let v = Version::first();
        assert_eq!(v.value(), 1);
        assert!(!v.is_new());
        assert!(v.is_created());
        assert_eq!(v, Version::new().next());
    }

    // 测试获取下一个版本
    #[test]
    fn test_version_next() {
        let v1 = Version::from_value(10);
        let v2 = v1.next();

        assert_eq!(v1.value(), 10);
        assert_eq!(v2.value(), 11);
    }

    // 测试版本比较
    #[test]
    fn test_version_ordering() {
        let v0 = Version::from_value(0);
        let v1 = Version::from_value(1);
        let v2 = Version::from_value(2);

        assert!(v1 > v0);
        assert!(v2 > v1);
        assert!(v0 < v2);
        assert_eq!(v1, Version::from_value(1));
    }

    // 测试 Display 实现
    #[test]
    fn test_version_display() {
        assert_eq!(format!("{}", Version::new()), "v0");
        assert_eq!(format!("{}", Version::from_value(5)), "v5");
    }

    // 测试 From<usize>/Into<usize> 实现
    #[test]
    fn test_version_conversions() {
        let v: Version = 42.into();
        assert_eq!(v.value(), 42);

        let num: usize = v.into();
        assert_eq!(num, 42);
    }

    // 测试序列化和反序列化
    #[test]
    fn test_version_serde() {
        let v = Version::from_value(42);

        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "42");

        let deserialized: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, v);
    }

    // 测试 Default 实现
    #[test]
    fn test_version_default() {
        let v: Version = Default::default();
        assert_eq!(v, Version::new());
    }
}
