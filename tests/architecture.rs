//! Architecture Verification Suite
//!
//! Keeps the layering honest: the coordinator only sees the store through
//! its traits, and everything shared across tasks stays thread-safe.

#[cfg(test)]
mod architecture_tests {
    use homescore::store::{RecordStore, WorkspaceDirectory};

    // 1. Components shared between tasks must be Send + Sync
    #[test]
    fn test_components_are_thread_safe() {
        fn assert_send_sync<T: Send + Sync>() {}

        assert_send_sync::<homescore::MutationCoordinator>();
        assert_send_sync::<homescore::SqliteRecordStore>();
        assert_send_sync::<homescore::EvaluationSchema>();
        assert_send_sync::<homescore::PropertyPatch>();
        assert_send_sync::<homescore::EvalError>();
    }

    // 2. The bundled store must satisfy both boundaries the coordinator needs
    #[test]
    fn test_sqlite_store_implements_boundaries() {
        fn assert_record_store<T: RecordStore>() {}
        fn assert_directory<T: WorkspaceDirectory>() {}

        assert_record_store::<homescore::SqliteRecordStore>();
        assert_directory::<homescore::SqliteRecordStore>();
    }

    // 3. Trait objects are how the coordinator holds its collaborators
    #[test]
    fn test_boundaries_are_object_safe() {
        #[allow(dead_code)]
        fn check(store: std::sync::Arc<dyn RecordStore>, directory: std::sync::Arc<dyn WorkspaceDirectory>) {
            let _ = homescore::MutationCoordinator::with_parts("user", store, directory);
        }
    }

    // 4. The standard catalogue is shared process-wide
    #[test]
    fn test_standard_schema_is_static() {
        let a: &'static homescore::EvaluationSchema = homescore::EvaluationSchema::standard();
        let b = homescore::EvaluationSchema::standard();
        assert!(std::ptr::eq(a, b));
    }
}
