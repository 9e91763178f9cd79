//! Transformation of two concurrent operations.
//!
//! Both operations are split into insertion and non-insertion parts, the
//! four pairs are transformed by the specialised transformers, and the
//! transformed parts are composed back together:
//!
//! ```text
//! client = ci0 ; cn0            server = si0 ; sn0
//! (ci1, si1) = ins×ins(ci0, si0)
//! (ci2, sn1) = ins×non(ci1, sn0)
//! (si2, cn1) = ins×non(si1, cn0)
//! (cn2, sn2) = non×non(cn1, sn1)
//! client′ = ci2 ; cn2           server′ = si2 ; sn2
//! ```

use tracing::debug;

use crate::error::TransformError;
use crate::operation::DocOp;

use super::composer::compose;
use super::decomposer::decompose;
use super::{insertion, insertion_noninsertion, noninsertion};

/// Transforms two operations made against the same document state.
///
/// Returns `(client′, server′)` such that `client ; server′` and
/// `server ; client′` lead to the same document.
pub fn transform(client: &DocOp, server: &DocOp) -> Result<(DocOp, DocOp), TransformError> {
    let client_len = client.initial_len();
    let server_len = server.initial_len();
    if client_len != server_len {
        debug!(%client, %server, client_len, server_len, "rejecting transform of mismatched lengths");
        return Err(TransformError::LengthMismatch {
            client: client_len,
            server: server_len,
        });
    }
    transform_parts(client, server).map_err(|error| {
        debug!(%client, %server, %error, "transform failed");
        error
    })
}

fn transform_parts(client: &DocOp, server: &DocOp) -> Result<(DocOp, DocOp), TransformError> {
    let (ci0, cn0) = decompose(client);
    let (si0, sn0) = decompose(server);
    let (ci1, si1) = insertion::transform(&ci0, &si0)?;
    let (ci2, sn1) = insertion_noninsertion::transform(&ci1, &sn0)?;
    let (si2, cn1) = insertion_noninsertion::transform(&si1, &cn0)?;
    let (cn2, sn2) = noninsertion::transform(&cn1, &sn1)?;
    Ok((compose(&ci2, &cn2)?, compose(&si2, &sn2)?))
}
