use paceload_core::WriteOutcome;

/// Map a failed upsert onto the writer's retry classification.
///
/// Connection loss, pool exhaustion, statement timeouts and the SQLSTATE
/// classes Postgres uses for contention or overload are retried. Anything
/// else (constraint violations, bad input, schema mismatch) is permanent.
pub fn classify_error(err: &sqlx::Error) -> WriteOutcome {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => WriteOutcome::transient(err.to_string()),
        sqlx::Error::Database(db_err) => match db_err.code() {
            Some(code) if is_transient_sqlstate(&code) => {
                WriteOutcome::transient(format!("{} (SQLSTATE {})", db_err.message(), code))
            }
            Some(code) => {
                WriteOutcome::permanent(format!("{} (SQLSTATE {})", db_err.message(), code))
            }
            None => WriteOutcome::permanent(db_err.message().to_string()),
        },
        _ => WriteOutcome::permanent(err.to_string()),
    }
}

/// SQLSTATE codes worth another attempt with identical input.
pub fn is_transient_sqlstate(code: &str) -> bool {
    // 08: connection exception, 53: insufficient resources
    if code.starts_with("08") || code.starts_with("53") {
        return true;
    }

    matches!(
        code,
        "40001" // serialization_failure
            | "40P01" // deadlock_detected
            | "55P03" // lock_not_available
            | "57014" // query_canceled (statement timeout)
            | "57P01" // admin_shutdown
            | "57P02" // crash_shutdown
            | "57P03" // cannot_connect_now
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_sqlstates() {
        for code in ["08006", "08001", "53300", "40001", "40P01", "57P03", "57014"] {
            assert!(is_transient_sqlstate(code), "{code} should be transient");
        }
    }

    #[test]
    fn test_permanent_sqlstates() {
        // not_null_violation, invalid_datetime_format, undefined_column
        for code in ["23502", "22007", "42703", "23505"] {
            assert!(!is_transient_sqlstate(code), "{code} should be permanent");
        }
    }

    #[test]
    fn test_io_and_pool_errors_are_transient() {
        let io = sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset by peer",
        ));
        assert!(matches!(classify_error(&io), WriteOutcome::FailedTransient(_)));
        assert!(matches!(
            classify_error(&sqlx::Error::PoolTimedOut),
            WriteOutcome::FailedTransient(_)
        ));
    }

    #[test]
    fn test_other_errors_are_permanent() {
        assert!(matches!(
            classify_error(&sqlx::Error::PoolClosed),
            WriteOutcome::FailedPermanent(_)
        ));
        assert!(matches!(
            classify_error(&sqlx::Error::RowNotFound),
            WriteOutcome::FailedPermanent(_)
        ));
    }
}
