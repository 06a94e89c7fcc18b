//! CallCoach Core Library
//!
//! 实时通话辅导核心：会话引擎、发言来源、AI 辅助请求与遥测。

pub mod assist;
pub mod config;
pub mod session;
pub mod telemetry;

pub use assist::{build_requester, AssistConfig, AssistError, AssistRequester};
pub use config::AppConfig;
pub use session::{LiveSessionEngine, SessionConfig, SessionError, SessionEvent, SessionScript};
