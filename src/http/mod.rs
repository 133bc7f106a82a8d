//! Request sending and lane dispatch.
mod dispatcher;
mod sender;

#[cfg(test)]
pub(crate) mod test_support;
#[cfg(test)]
mod tests;

pub use dispatcher::{dispatch, request_id};
pub use sender::{ID_HEADER, RequestSender, ReqwestSender, SenderSettings};
