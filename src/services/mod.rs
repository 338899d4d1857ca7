pub mod member_service;
pub mod push_service;
pub mod session_service;
pub mod team_service;

pub use member_service::{InviteOutcome, InviteRequest, MemberService, MemberUpdateRequest};
pub use push_service::{PushService, SendReport, SendRequest, SubscribeRequest};
pub use session_service::{AssignRequest, ReplyOutcome, SessionAction, SessionOutcome, SessionService};
pub use team_service::TeamService;
