#[cfg(test)]
pub mod http_stub;

/// Joins an API root and a relative path, tolerating trailing slashes on the root
/// (`https://host/api/v1/challenges/` + `12/solves`).
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        return base.to_string();
    }

    format!("{base}/{path}")
}

/// Drives `future` to completion on a fresh single-threaded runtime.
/// For async code exercised inside `figment::Jail`, whose closure is synchronous.
#[cfg(test)]
pub fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://a/b", "1/solves"), "http://a/b/1/solves");
        assert_eq!(join_url("http://a/b/", "/1/solves"), "http://a/b/1/solves");
        assert_eq!(join_url("http://a/b//", ""), "http://a/b");
    }
}
