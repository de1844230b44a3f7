use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    #[error("sender or recipient does not exist")]
    UsersNotFound,
    #[error("sender and recipient are not friends")]
    NoFriendship,
    #[error("message could not be stored")]
    SendFailed,
}

impl SendError {
    /// Integer form for callers that speak in sentinels. Valid message ids are
    /// always positive, so none of these collide with a success.
    pub fn code(self) -> i64 {
        match self {
            SendError::NoFriendship => -1,
            SendError::UsersNotFound => -2,
            SendError::SendFailed => 0,
        }
    }
}
