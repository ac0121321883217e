//! Path shape matching.
//!
//! # Design Decisions
//! - Segments are compared case-sensitively
//! - Empty segments (`//`, trailing `/`) never match an RPC shape
//! - Segments past the module are joined into a dotted method name
//! - No regex; a single split over the path

/// Prefix every routed path shares.
pub const API_PREFIX: &str = "/api/";

/// Target of an RPC call parsed from the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTarget {
    pub protocol: String,
    pub module: Option<String>,
    pub method: String,
}

impl CallTarget {
    /// Name sent to the backend: `module.method` when a module segment is present.
    pub fn qualified_method(&self) -> String {
        match &self.module {
            Some(module) => format!("{}.{}", module, self.method),
            None => self.method.clone(),
        }
    }
}

/// Split `/api/{name}{rest}` into `name` and `rest`.
///
/// `rest` keeps its leading slash and is `/` when nothing follows the name.
pub fn split_api_path(path: &str) -> Option<(&str, &str)> {
    let tail = path.strip_prefix(API_PREFIX)?;
    let (name, rest) = match tail.find('/') {
        Some(idx) => (&tail[..idx], &tail[idx..]),
        None => (tail, "/"),
    };
    if name.is_empty() {
        return None;
    }
    Some((name, rest))
}

/// Match `/api/{protocol}/{method}` or `/api/{protocol}/{module}/{method}[/...]`.
///
/// With more than three segments the trailing ones form the method, so
/// `/api/P/Doc/Lock/Shared` calls `Doc.Lock.Shared`.
pub fn match_call(path: &str) -> Option<CallTarget> {
    let tail = path.strip_prefix(API_PREFIX)?;
    let segments: Vec<&str> = tail.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }

    match segments.as_slice() {
        [protocol, method] => Some(CallTarget {
            protocol: protocol.to_string(),
            module: None,
            method: method.to_string(),
        }),
        [protocol, module, method @ ..] => Some(CallTarget {
            protocol: protocol.to_string(),
            module: Some(module.to_string()),
            method: method.join("."),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_api_path() {
        assert_eq!(split_api_path("/api/oss/v1/download"), Some(("oss", "/v1/download")));
        assert_eq!(split_api_path("/api/oss"), Some(("oss", "/")));
        assert_eq!(split_api_path("/api/oss/"), Some(("oss", "/")));
        assert_eq!(split_api_path("/api/"), None);
        assert_eq!(split_api_path("/other/oss"), None);
    }

    #[test]
    fn test_match_call_two_segments() {
        let target = match_call("/api/EVFS/GetInfo").unwrap();
        assert_eq!(target.protocol, "EVFS");
        assert_eq!(target.module, None);
        assert_eq!(target.qualified_method(), "GetInfo");
    }

    #[test]
    fn test_match_call_with_module() {
        let target = match_call("/api/EFAST/Doc/Lock").unwrap();
        assert_eq!(target.protocol, "EFAST");
        assert_eq!(target.module.as_deref(), Some("Doc"));
        assert_eq!(target.qualified_method(), "Doc.Lock");
    }

    #[test]
    fn test_match_call_joins_trailing_segments() {
        let target = match_call("/api/EFAST/Doc/Lock/Shared").unwrap();
        assert_eq!(target.protocol, "EFAST");
        assert_eq!(target.module.as_deref(), Some("Doc"));
        assert_eq!(target.method, "Lock.Shared");
        assert_eq!(target.qualified_method(), "Doc.Lock.Shared");
    }

    #[test]
    fn test_match_call_rejects_other_shapes() {
        assert!(match_call("/api/EVFS").is_none());
        assert!(match_call("/api/EVFS/").is_none());
        assert!(match_call("/api/EVFS//GetInfo").is_none());
        assert!(match_call("/api/a/b/c/").is_none());
        assert!(match_call("/EVFS/GetInfo").is_none());
    }
}
