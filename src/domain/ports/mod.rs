//! Ports implemented by external collaborators.

pub mod completion;
pub mod data_provider;

pub use completion::{
    complete_json, complete_text, extract_json_object, parse_json_response, ChatMessage,
    CompletionClient, CompletionError, CompletionRequest, CompletionResponse, RequestKind,
    ResponseFormat, Role,
};
pub use data_provider::{DataProvider, ProviderError, UNAVAILABLE_LABEL};
