//! Signal handling.
//!
//! # Responsibilities
//! - Cancel the root context on Ctrl-C so in-flight deliveries stop promptly

use crate::lifecycle::context::Context;

/// Spawn a task that cancels `ctx` on the first Ctrl-C.
pub fn cancel_on_ctrl_c(ctx: &Context) -> tokio::task::JoinHandle<()> {
    let ctx = ctx.clone();
    tokio::spawn(async move {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                match res {
                    Ok(()) => tracing::info!("Interrupt received, cancelling delivery"),
                    Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
                }
                ctx.cancel();
            }
            _ = ctx.token().cancelled() => {}
        }
    })
}
