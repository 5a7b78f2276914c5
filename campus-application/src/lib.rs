//! 校务记录系统的应用层
//!
//! 对外暴露三类外部命令（标量更新、关联集合替换、带守卫的删除），
//! 经进程内命令总线分派到处理器，处理器委托领域层的变更编排器执行。
//! 同时提供测试与演示用的内存存储引擎实现。
//!
pub mod command;
pub mod command_bus;
pub mod command_handler;
pub mod context;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod inmemory_command_bus;
pub mod memory_engine;
pub mod records;

pub use inmemory_command_bus::InMemoryCommandBus;
pub use memory_engine::MemoryEngine;
