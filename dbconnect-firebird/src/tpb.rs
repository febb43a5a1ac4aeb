//! Transaction Parameter Buffer construction for `isc_start_transaction`.
//!
//! Same flat-byte-string shape as a DPB, but TPB tags are bare bytes with no
//! length-prefixed values — every option here is a single-byte flag.

use dbconnect_core::types::IsolationLevel;

const ISC_TPB_VERSION3: u8 = 3;
const ISC_TPB_CONSISTENCY: u8 = 1;
const ISC_TPB_CONCURRENCY: u8 = 2;
const ISC_TPB_WAIT: u8 = 6;
const ISC_TPB_WRITE: u8 = 9;
const ISC_TPB_READ_COMMITTED: u8 = 15;
const ISC_TPB_REC_VERSION: u8 = 17;

/// Builds the TPB for `level`.
///
/// Firebird has no true READ UNCOMMITTED; both `None` and `ReadUncommitted` map to
/// READ COMMITTED, the least isolated level the engine actually offers (the same
/// choice the PostgreSQL driver's `IsolationLevel::to_postgres_sql` makes for `None`).
pub fn for_isolation(level: IsolationLevel) -> Vec<u8> {
    let mut tpb = vec![ISC_TPB_VERSION3, ISC_TPB_WRITE, ISC_TPB_WAIT];
    match level {
        IsolationLevel::None | IsolationLevel::ReadUncommitted | IsolationLevel::ReadCommitted => {
            tpb.push(ISC_TPB_READ_COMMITTED);
            tpb.push(ISC_TPB_REC_VERSION);
        }
        IsolationLevel::RepeatableRead => {
            tpb.push(ISC_TPB_CONCURRENCY);
        }
        IsolationLevel::Serializable => {
            tpb.push(ISC_TPB_CONSISTENCY);
        }
    }
    tpb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_committed_uses_rec_version() {
        let tpb = for_isolation(IsolationLevel::ReadCommitted);
        assert!(tpb.contains(&ISC_TPB_READ_COMMITTED));
        assert!(tpb.contains(&ISC_TPB_REC_VERSION));
    }

    #[test]
    fn serializable_uses_consistency() {
        let tpb = for_isolation(IsolationLevel::Serializable);
        assert!(tpb.contains(&ISC_TPB_CONSISTENCY));
        assert!(!tpb.contains(&ISC_TPB_CONCURRENCY));
    }

    #[test]
    fn every_tpb_starts_with_version_and_write_wait() {
        for level in [
            IsolationLevel::None,
            IsolationLevel::ReadUncommitted,
            IsolationLevel::ReadCommitted,
            IsolationLevel::RepeatableRead,
            IsolationLevel::Serializable,
        ] {
            let tpb = for_isolation(level);
            assert_eq!(&tpb[..3], &[ISC_TPB_VERSION3, ISC_TPB_WRITE, ISC_TPB_WAIT]);
        }
    }
}
