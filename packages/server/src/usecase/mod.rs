//! UseCase 層
//!
//! トランスポートからのイベントをドメイン層の状態変更と送信指示に変換します。

mod room_query;
mod session_coordinator;

pub use room_query::{MemberInfo, RoomDetail};
pub use session_coordinator::{DisconnectOutcome, JoinOutcome, SessionCoordinator};
