//! xDLMS APDUs

pub mod action;
pub mod conformance;
pub mod exception;
pub mod get;
pub mod initiate;
pub mod invoke_id;
pub mod notification;
pub mod set;

pub use action::{
    ActionRequestNormal, ActionResponseNormal, ActionResponseNormalWithData,
    ActionResponseNormalWithError,
};
pub use conformance::Conformance;
pub use exception::ExceptionResponse;
pub use get::{
    GetRequestNext, GetRequestNormal, GetRequestWithList, GetResponseLastBlock,
    GetResponseLastBlockWithError, GetResponseNormal, GetResponseNormalWithError,
    GetResponseWithDataBlock, GetResponseWithList,
};
pub use initiate::{
    GlobalCipherInitiateRequest, GlobalCipherInitiateResponse, InitiateRequest, InitiateResponse,
};
pub use invoke_id::{InvokeIdAndPriority, LongInvokeIdAndPriority};
pub use notification::DataNotification;
pub use set::{SetRequestNormal, SetResponseNormal};
