pub mod customer;
pub mod invite;
pub mod membership;
pub mod push;
pub mod session;
pub mod team;
pub mod user;

pub use customer::Customer;
pub use invite::{Invite, InviteStatus, NewInvite};
pub use membership::{
    LegacyMembership, MemberEntry, Membership, MembershipRow, MembershipScope, MembershipUpdate,
    NewMembership,
};
pub use push::{NewSubscription, PushSubscription};
pub use session::{
    Assignment, ChatMessage, ChatSession, Escalation, MessageRole, NewEscalation, NewMessage,
    SenderType, SessionFilter, SessionListItem,
};
pub use team::{NewTeam, Team, TeamSummary, TeamUpdate};
pub use user::UserProfile;
