use super::state::WorkerState;
use crate::config::BypassRules;
use crate::types::Request;

/// Why a request goes straight to the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassthroughReason {
    /// The worker is not active, so it does not control the page.
    NotControlling,
    NonGetMethod,
    /// Dynamic endpoint (`/`, `/chat/`, `/ws/`, `/auth/` by default).
    DynamicPath,
}

/// Which branch of the fetch handler a request takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchRoute {
    Passthrough(PassthroughReason),
    /// Look in the cache first, fall back to the network on a miss.
    CacheFirst,
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseSource {
    Cache,
    Network,
}

pub fn route(state: WorkerState, bypass: &BypassRules, request: &Request) -> FetchRoute {
    if !state.controls_pages() {
        FetchRoute::Passthrough(PassthroughReason::NotControlling)
    } else if !request.is_get() {
        FetchRoute::Passthrough(PassthroughReason::NonGetMethod)
    } else if bypass.matches(request.path()) {
        FetchRoute::Passthrough(PassthroughReason::DynamicPath)
    } else {
        FetchRoute::CacheFirst
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    fn req(method: Method, url: &str) -> Request {
        Request::parse(method, url).unwrap()
    }

    #[test]
    fn test_routing_table() {
        let rules = BypassRules::default();
        let active = WorkerState::Active;
        let pass = |reason| FetchRoute::Passthrough(reason);
        let cases = [
            ("POST", "http://localhost:8000/static/a.css", pass(PassthroughReason::NonGetMethod)),
            ("HEAD", "http://localhost:8000/static/a.css", pass(PassthroughReason::NonGetMethod)),
            ("GET", "http://localhost:8000/", pass(PassthroughReason::DynamicPath)),
            ("GET", "http://localhost:8000/?tab=rooms", pass(PassthroughReason::DynamicPath)),
            ("GET", "http://localhost:8000/chat/42/", pass(PassthroughReason::DynamicPath)),
            ("GET", "ws://localhost:8000/ws/chat/42/", pass(PassthroughReason::DynamicPath)),
            ("GET", "http://localhost:8000/auth/logout/", pass(PassthroughReason::DynamicPath)),
            ("GET", "http://localhost:8000/static/images/logo_192.png", FetchRoute::CacheFirst),
            ("GET", "https://cdn.tailwindcss.com/", FetchRoute::CacheFirst),
        ];
        for (method, url, expected) in cases {
            let method = Method::from_bytes(method.as_bytes()).unwrap();
            assert_eq!(route(active, &rules, &req(method, url)), expected, "{}", url);
        }
    }

    #[test]
    fn test_inactive_worker_never_intercepts() {
        let rules = BypassRules::default();
        let r = req(Method::GET, "http://localhost:8000/static/a.css");
        for state in [WorkerState::Installing, WorkerState::Waiting, WorkerState::Redundant] {
            assert_eq!(
                route(state, &rules, &r),
                FetchRoute::Passthrough(PassthroughReason::NotControlling)
            );
        }
    }
}
