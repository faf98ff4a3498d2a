pub mod board_service;
pub mod client_service;
pub mod control_service;
pub mod member_service;

pub use board_service::{BoardService, MovedItem};
pub use client_service::ClientService;
pub use control_service::{ComplianceSummary, ControlService, ControlUpdate};
pub use member_service::MemberService;
