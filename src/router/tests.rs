use super::{HttpMethod, RouteDescriptor, UnsupportedMethod};

#[test]
fn test_exact_match() {
    let route = RouteDescriptor::get("/user");
    assert!(route.matches("GET", "/user"));
}

#[test]
fn test_verb_mismatch() {
    let route = RouteDescriptor::post("/user");
    assert!(!route.matches("GET", "/user"));
    assert!(route.matches("POST", "/user"));
}

#[test]
fn test_no_trailing_slash_normalization() {
    let route = RouteDescriptor::get("/user");
    assert!(!route.matches("GET", "/user/"));
    assert!(!RouteDescriptor::get("/user/").matches("GET", "/user"));
}

#[test]
fn test_case_sensitive() {
    let route = RouteDescriptor::get("/User");
    assert!(!route.matches("GET", "/user"));
    assert!(!route.matches("get", "/User"));
}

#[test]
fn test_no_parameterized_segments() {
    let route = RouteDescriptor::get("/users/{id}");
    assert!(!route.matches("GET", "/users/7"));
    assert!(route.matches("GET", "/users/{id}"));
}

#[test]
fn test_method_round_trip_strings() {
    assert_eq!(HttpMethod::Get.as_str(), "GET");
    assert_eq!(HttpMethod::Post.to_string(), "POST");
    assert_eq!("POST".parse::<HttpMethod>(), Ok(HttpMethod::Post));
    assert_eq!(
        "PUT".parse::<HttpMethod>(),
        Err(UnsupportedMethod("PUT".to_string()))
    );
    assert!("get".parse::<HttpMethod>().is_err());
}

#[test]
fn test_http_method_conversion() {
    assert_eq!(HttpMethod::try_from(&http::Method::GET), Ok(HttpMethod::Get));
    assert!(HttpMethod::try_from(&http::Method::DELETE).is_err());
    assert_eq!(http::Method::from(HttpMethod::Post), http::Method::POST);
}

#[test]
fn test_display() {
    assert_eq!(RouteDescriptor::post("/orders").to_string(), "POST /orders");
}
