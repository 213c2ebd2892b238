//! ドメイン層のエラー型

use thiserror::Error;

/// 値オブジェクト生成時のバリデーションエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("connection id must not be empty")]
    ConnectionIdEmpty,

    #[error("room id must not be empty")]
    RoomIdEmpty,

    #[error("room id is too long ({0} > {max} chars)", max = super::value_object::RoomId::MAX_LEN)]
    RoomIdTooLong(usize),

    #[error("display name must not be empty")]
    DisplayNameEmpty,

    #[error("display name is too long ({0} > {max} chars)", max = super::value_object::DisplayName::MAX_LEN)]
    DisplayNameTooLong(usize),

    #[error("message text must not be empty")]
    MessageTextEmpty,

    #[error("message text is too long ({0} > {max} chars)", max = super::value_object::MessageText::MAX_LEN)]
    MessageTextTooLong(usize),
}

/// MessagePusher の送信エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("connection '{0}' is not registered")]
    ClientNotFound(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),
}
