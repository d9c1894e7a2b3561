//! # Sale Status Machine
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   pending ───────► paid ───────► returned ■                             │
//! │      │                                                                  │
//! │      └──────────► cancelled ■                                           │
//! │                                                                         │
//! │   ■ terminal. Rewriting the current status is always accepted.         │
//! │                                                                         │
//! │   Normal mode          only the edges above                             │
//! │   Administrative mode  any target, except leaving `returned`            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `returned` is only entered through `create_return` in practice, but a
//! caller asking for `paid → returned` directly is accepted.

use crate::error::{CoreError, CoreResult};
use crate::types::SaleStatus;

/// Who is asking for the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChangeMode {
    Normal,
    /// Bypasses the edge check (back-office correction).
    Administrative,
}

/// What applying a requested status amounts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Unchanged,
    Changed { from: SaleStatus, to: SaleStatus },
}

/// True for the forward edges of the lifecycle.
pub fn is_forward_edge(from: SaleStatus, to: SaleStatus) -> bool {
    matches!(
        (from, to),
        (SaleStatus::Pending, SaleStatus::Paid)
            | (SaleStatus::Pending, SaleStatus::Cancelled)
            | (SaleStatus::Paid, SaleStatus::Returned)
    )
}

/// Decides whether a sale currently in `from` may be written with `to`.
pub fn check_transition(
    sale_id: &str,
    from: SaleStatus,
    to: SaleStatus,
    mode: StatusChangeMode,
) -> CoreResult<StatusChange> {
    if from == to {
        return Ok(StatusChange::Unchanged);
    }

    if from == SaleStatus::Returned {
        return Err(CoreError::SaleAlreadyReturned {
            sale_id: sale_id.to_string(),
        });
    }

    if mode == StatusChangeMode::Normal && !is_forward_edge(from, to) {
        return Err(CoreError::InvalidStatusTransition {
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    Ok(StatusChange::Changed { from, to })
}

/// Status a new sale may start in. Defaults to `pending`.
pub fn initial_status(requested: Option<SaleStatus>) -> CoreResult<SaleStatus> {
    match requested.unwrap_or_default() {
        status @ (SaleStatus::Pending | SaleStatus::Paid) => Ok(status),
        other => Err(CoreError::InvalidStatusTransition {
            from: "new".to_string(),
            to: other.to_string(),
        }),
    }
}

/// Returns can be recorded against paid sales and sales already returned.
pub fn is_returnable(status: SaleStatus) -> bool {
    matches!(status, SaleStatus::Paid | SaleStatus::Returned)
}

/// Lines can be edited or removed while the sale is still open.
pub fn check_line_maintenance(sale_id: &str, status: SaleStatus) -> CoreResult<()> {
    match status {
        SaleStatus::Pending | SaleStatus::Paid => Ok(()),
        other => Err(CoreError::InvalidSaleStatus {
            sale_id: sale_id.to_string(),
            status: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SaleStatus::*;

    const ALL: [SaleStatus; 4] = [Pending, Paid, Cancelled, Returned];

    #[test]
    fn test_forward_edges() {
        for (from, to) in [(Pending, Paid), (Pending, Cancelled), (Paid, Returned)] {
            assert_eq!(
                check_transition("s", from, to, StatusChangeMode::Normal).unwrap(),
                StatusChange::Changed { from, to }
            );
        }
    }

    #[test]
    fn test_backward_edges_rejected_in_normal_mode() {
        for (from, to) in [(Paid, Pending), (Cancelled, Paid), (Pending, Returned), (Paid, Cancelled)] {
            let err = check_transition("s", from, to, StatusChangeMode::Normal).unwrap_err();
            assert_eq!(err.code(), "INVALID_STATUS_TRANSITION");
        }
    }

    #[test]
    fn test_same_status_is_idempotent() {
        for status in ALL {
            for mode in [StatusChangeMode::Normal, StatusChangeMode::Administrative] {
                assert_eq!(
                    check_transition("s", status, status, mode).unwrap(),
                    StatusChange::Unchanged
                );
            }
        }
    }

    #[test]
    fn test_returned_is_terminal_in_every_mode() {
        for to in [Pending, Paid, Cancelled] {
            for mode in [StatusChangeMode::Normal, StatusChangeMode::Administrative] {
                let err = check_transition("s", Returned, to, mode).unwrap_err();
                assert_eq!(
                    err,
                    CoreError::SaleAlreadyReturned {
                        sale_id: "s".to_string()
                    }
                );
            }
        }
    }

    #[test]
    fn test_administrative_override() {
        assert!(check_transition("s", Cancelled, Pending, StatusChangeMode::Administrative).is_ok());
        assert!(check_transition("s", Paid, Pending, StatusChangeMode::Administrative).is_ok());
    }

    #[test]
    fn test_initial_status() {
        assert_eq!(initial_status(None).unwrap(), Pending);
        assert_eq!(initial_status(Some(Paid)).unwrap(), Paid);
        assert!(initial_status(Some(Returned)).is_err());
        assert!(initial_status(Some(Cancelled)).is_err());
    }

    #[test]
    fn test_returnable_and_maintenance() {
        assert!(is_returnable(Paid));
        assert!(is_returnable(Returned));
        assert!(!is_returnable(Pending));
        assert!(!is_returnable(Cancelled));

        assert!(check_line_maintenance("s", Pending).is_ok());
        assert!(check_line_maintenance("s", Paid).is_ok());
        assert_eq!(
            check_line_maintenance("s", Returned).unwrap_err().code(),
            "INVALID_SALE_STATUS"
        );
    }
}
