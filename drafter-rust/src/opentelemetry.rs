use crate::DraftResult;
use opentelemetry::trace::Status;
use std::future::Future;
use tracing::{info_span, Span};
use tracing_futures::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionOperation {
    Generate,
    GenerateAll,
    RegenerateDrawing,
    Analyze,
    Refine,
    SelectVersion,
    CommitUserEdit,
    UpdateBrief,
    ReplaceBrief,
    EditDrawingCode,
    ChooseTitleCandidate,
}

impl SessionOperation {
    fn as_str(self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::GenerateAll => "generate_all",
            Self::RegenerateDrawing => "regenerate_drawing",
            Self::Analyze => "analyze",
            Self::Refine => "refine",
            Self::SelectVersion => "select_version",
            Self::CommitUserEdit => "commit_user_edit",
            Self::UpdateBrief => "update_brief",
            Self::ReplaceBrief => "replace_brief",
            Self::EditDrawingCode => "edit_drawing_code",
            Self::ChooseTitleCandidate => "choose_title_candidate",
        }
    }
}

pub struct OperationSpan {
    span: Span,
}

impl OperationSpan {
    pub fn new(operation: SessionOperation, target: &str) -> Self {
        let span = match operation {
            SessionOperation::Generate => info_span!("patent_drafter.generate"),
            SessionOperation::GenerateAll => info_span!("patent_drafter.generate_all"),
            SessionOperation::RegenerateDrawing => {
                info_span!("patent_drafter.regenerate_drawing")
            }
            SessionOperation::Analyze => info_span!("patent_drafter.analyze"),
            SessionOperation::Refine => info_span!("patent_drafter.refine"),
            SessionOperation::SelectVersion => info_span!("patent_drafter.select_version"),
            SessionOperation::CommitUserEdit => info_span!("patent_drafter.commit_user_edit"),
            SessionOperation::UpdateBrief => info_span!("patent_drafter.update_brief"),
            SessionOperation::ReplaceBrief => info_span!("patent_drafter.replace_brief"),
            SessionOperation::EditDrawingCode => {
                info_span!("patent_drafter.edit_drawing_code")
            }
            SessionOperation::ChooseTitleCandidate => {
                info_span!("patent_drafter.choose_title_candidate")
            }
        };
        span.set_attribute("draft.operation", operation.as_str());
        span.set_attribute("draft.target", target.to_string());

        Self { span }
    }

    pub fn span(&self) -> Span {
        self.span.clone()
    }

    pub fn on_error(&mut self, error: &(dyn std::error::Error + 'static)) {
        self.span
            .set_attribute("exception.message", error.to_string());
        self.span.set_status(Status::error(error.to_string()));
    }
}

/// Record how many versions the current operation committed.
pub fn record_committed(count: usize) {
    Span::current().set_attribute(
        "draft.committed",
        i64::try_from(count).unwrap_or(i64::MAX),
    );
}

pub async fn trace_operation<T, Fut>(
    operation: SessionOperation,
    target: &str,
    future: Fut,
) -> DraftResult<T>
where
    Fut: Future<Output = DraftResult<T>>,
{
    let mut span = OperationSpan::new(operation, target);
    let result = future.instrument(span.span()).await;

    if let Err(error) = &result {
        span.on_error(error);
    }
    result
}
