//! The built-in projection handlers.

pub mod list_view;
pub mod sequence_flow;

use crate::handler::{DynExportHandler, HandlerAdapter};

/// The default handler set: list-view process instances and sequence flows.
#[must_use]
pub fn default_handlers() -> Vec<Box<dyn DynExportHandler>> {
    vec![
        Box::new(HandlerAdapter::new(
            list_view::ListViewProcessInstanceHandler::new(),
        )),
        Box::new(HandlerAdapter::new(sequence_flow::SequenceFlowHandler::new())),
    ]
}
