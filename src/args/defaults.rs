pub(crate) const DEFAULT_USER_AGENT: &str = concat!("blowhole/", env!("CARGO_PKG_VERSION"));

pub(crate) const DEFAULT_URL: &str = "http://localhost:8000/";

pub(crate) const DEFAULT_COORDINATOR_ADDR: &str = "127.0.0.1:9111";

pub(crate) const DEFAULT_TEST_NAME: &str = "unnamed";

pub(crate) const DEFAULT_EXPECTED_AGENTS: usize = 2;
