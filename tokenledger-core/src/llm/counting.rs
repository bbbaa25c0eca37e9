use std::time::Instant;
use tracing::trace;

use super::policy::{Completion, CompletionRequest, LanguageModel};
use crate::accounting::InvocationContext;
use crate::error::LedgerResult;

/// Call `model` and record its usage against `ctx`.
///
/// A failed request records nothing.
pub async fn invoke_counted(
    ctx: &InvocationContext,
    model: &dyn LanguageModel,
    request: &CompletionRequest,
) -> LedgerResult<Completion> {
    let start = Instant::now();
    let completion = model.generate(request).await?;
    let elapsed = start.elapsed().as_secs_f64();

    let provider = model.provider();
    let cost = ctx.record_usage(
        provider.as_str(),
        model.model_name(),
        &completion.usage,
        elapsed,
    );
    trace!(
        origin = %ctx.origin(),
        provider = %provider,
        model = model.model_name(),
        total_tokens = completion.usage.total_tokens,
        cost,
        "Counted model request"
    );

    Ok(completion)
}
