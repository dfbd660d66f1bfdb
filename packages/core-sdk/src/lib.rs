pub mod bot;
pub mod config;
pub mod llm;
pub mod models;
pub mod smoke;
pub mod telemetry;

/**
 * \brief SDK 预导入集合，方便外部引用常用模块。
 */
pub mod prelude {
    pub use crate::bot;
    pub use crate::config;
    pub use crate::llm;
    pub use crate::models;
    pub use crate::smoke;
    pub use crate::telemetry;
}
