//! Per-organization ooid assignment
//!
//! Numbers are handed out inside the caller's transaction. The
//! organization row is locked first so two requests of the same tenant
//! cannot read the same `MAX(ooid)`; other tenants are not blocked.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::folio::{next_sequence, SequenceScope};

/// Reserve the next ooid of `scope` for the organization.
///
/// `conn` must be inside a transaction: the lock is held until it commits,
/// so the caller inserts the row carrying the number before committing.
pub async fn next_ooid(
    conn: &mut PgConnection,
    organization_id: Uuid,
    scope: SequenceScope,
) -> AppResult<i64> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM organizations WHERE id = $1 FOR UPDATE")
        .bind(organization_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("Organization"))?;

    let query = format!(
        "SELECT MAX(ooid) FROM {} WHERE organization_id = $1",
        scope.table()
    );
    let current_max = sqlx::query_scalar::<_, Option<i64>>(&query)
        .bind(organization_id)
        .fetch_one(&mut *conn)
        .await?;

    let ooid = next_sequence(current_max);
    tracing::info!(%organization_id, folio = %scope.folio(ooid), "ooid assigned");

    Ok(ooid)
}
