//! Host bindings
//!
//! Root-scope globals and the method vocabulary of each host class. All
//! host state is deterministic: the same tree with the same inputs yields
//! the same captured output.

use super::scope::{BindingKind, Scope, ScopeRef};
use super::value::{ObjectData, Value};

pub const MATH_METHODS: &[&str] = &[
    "abs", "floor", "ceil", "round", "trunc", "sign", "sqrt", "cbrt", "pow", "min", "max",
    "random", "log", "log2", "log10", "exp", "hypot",
];

pub const CONSOLE_METHODS: &[&str] = &["log", "warn", "error", "info"];

pub const DOCUMENT_METHODS: &[&str] = &[
    "getElementById",
    "querySelector",
    "querySelectorAll",
    "getElementsByClassName",
    "getElementsByTagName",
    "createElement",
    "createTextNode",
    "addEventListener",
    "removeEventListener",
];

pub const ELEMENT_METHODS: &[&str] = &[
    "getAttribute",
    "setAttribute",
    "removeAttribute",
    "hasAttribute",
    "toggleAttribute",
    "addEventListener",
    "removeEventListener",
    "focus",
    "blur",
    "click",
    "appendChild",
    "removeChild",
    "insertBefore",
    "replaceChild",
    "remove",
    "querySelector",
    "querySelectorAll",
    "closest",
    "contains",
    "dispatchEvent",
];

pub const STORAGE_METHODS: &[&str] = &["getItem", "setItem", "removeItem", "clear", "key"];

pub const LOCATION_METHODS: &[&str] = &["assign", "replace", "reload", "toString"];

pub const WINDOW_METHODS: &[&str] = &[
    "setTimeout",
    "clearTimeout",
    "setInterval",
    "clearInterval",
    "requestAnimationFrame",
    "cancelAnimationFrame",
    "alert",
    "confirm",
    "prompt",
    "addEventListener",
    "removeEventListener",
];

pub const TOKEN_LIST_METHODS: &[&str] = &["add", "remove", "toggle", "contains", "replace"];

pub const EVENT_METHODS: &[&str] = &[
    "preventDefault",
    "stopPropagation",
    "stopImmediatePropagation",
];

/// Resolve a method on a host class to its dotted builtin name.
pub fn class_method(class_name: &str, name: &str) -> Option<String> {
    let methods = match class_name {
        "Math" => MATH_METHODS,
        "Document" => DOCUMENT_METHODS,
        "HTMLElement" => ELEMENT_METHODS,
        "Storage" => STORAGE_METHODS,
        "Location" => LOCATION_METHODS,
        "Window" => WINDOW_METHODS,
        "DOMTokenList" => TOKEN_LIST_METHODS,
        "Event" | "KeyboardEvent" => EVENT_METHODS,
        _ => return None,
    };
    if methods.contains(&name) {
        Some(format!("{}.{}", class_name, name))
    } else {
        None
    }
}

/// Build the root scope: standard globals always, browser globals when DOM
/// simulation is enabled.
pub fn create_root_scope(dom_simulation: bool) -> ScopeRef {
    let root = Scope::root();
    let declare = |name: &str, value: Value| {
        Scope::declare(&root, name, value, BindingKind::Const);
    };

    declare("undefined", Value::Undefined);
    declare("NaN", Value::Number(f64::NAN));
    declare("Infinity", Value::Number(f64::INFINITY));
    declare("globalThis", Value::Undefined);

    declare("console", Value::Builtin("console".to_string()));
    declare("JSON", Value::Builtin("JSON".to_string()));
    declare("Object", Value::Builtin("Object".to_string()));
    declare("Array", Value::Builtin("Array".to_string()));
    declare("String", Value::Builtin("String".to_string()));
    declare("Number", Value::Builtin("Number".to_string()));
    declare("Boolean", Value::Builtin("Boolean".to_string()));

    let mut math = ObjectData::new("Math");
    math.properties.insert("PI".to_string(), Value::Number(std::f64::consts::PI));
    math.properties.insert("E".to_string(), Value::Number(std::f64::consts::E));
    declare("Math", Value::object(math));

    for name in [
        "parseInt",
        "parseFloat",
        "isNaN",
        "isFinite",
        "encodeURI",
        "decodeURI",
        "encodeURIComponent",
        "decodeURIComponent",
    ] {
        declare(name, Value::Builtin(name.to_string()));
    }

    if dom_simulation {
        install_browser_globals(&root);
    }

    root
}

fn install_browser_globals(root: &ScopeRef) {
    let location = {
        let mut data = ObjectData::new("Location");
        data.properties.insert("href".to_string(), Value::Str(String::new()));
        data.properties.insert("pathname".to_string(), Value::Str("/".to_string()));
        data.properties.insert("search".to_string(), Value::Str(String::new()));
        data.properties.insert("hash".to_string(), Value::Str(String::new()));
        Value::object(data)
    };
    let navigator = {
        let mut data = ObjectData::new("Navigator");
        data.properties
            .insert("userAgent".to_string(), Value::Str("a11y-analyzer".to_string()));
        data.properties.insert("language".to_string(), Value::Str("en-US".to_string()));
        Value::object(data)
    };
    let local_storage = Value::object(ObjectData::new("Storage"));
    let session_storage = Value::object(ObjectData::new("Storage"));

    let document = {
        let mut data = ObjectData::new("Document");
        data.properties.insert("title".to_string(), Value::Str(String::new()));
        data.properties.insert("body".to_string(), make_element("body", ""));
        Value::object(data)
    };

    let window = {
        let mut data = ObjectData::new("Window");
        data.properties.insert("location".to_string(), location.clone());
        data.properties.insert("navigator".to_string(), navigator.clone());
        data.properties
            .insert("localStorage".to_string(), local_storage.clone());
        data.properties
            .insert("sessionStorage".to_string(), session_storage.clone());
        data.properties.insert("document".to_string(), document.clone());
        Value::object(data)
    };

    let declare = |name: &str, value: Value| {
        Scope::declare(root, name, value, BindingKind::Const);
    };
    declare("window", window.clone());
    declare("self", window);
    declare("document", document);
    declare("location", location);
    declare("navigator", navigator);
    declare("localStorage", local_storage);
    declare("sessionStorage", session_storage);

    for name in WINDOW_METHODS {
        declare(name, Value::Builtin(format!("Window.{}", name)));
    }
    for name in ["Element", "HTMLElement", "Node", "Event"] {
        declare(name, Value::Builtin(name.to_string()));
    }
}

/// Create a mock element object.
pub fn make_element(tag: &str, id: &str) -> Value {
    let mut data = ObjectData::new("HTMLElement");
    data.properties
        .insert("tagName".to_string(), Value::Str(tag.to_uppercase()));
    data.properties.insert("id".to_string(), Value::Str(id.to_string()));
    data.properties
        .insert("className".to_string(), Value::Str(String::new()));
    data.properties
        .insert("textContent".to_string(), Value::Str(String::new()));
    data.properties
        .insert("innerHTML".to_string(), Value::Str(String::new()));
    data.properties.insert("value".to_string(), Value::Str(String::new()));
    data.properties
        .insert("style".to_string(), Value::object(ObjectData::new("CSSStyleDeclaration")));
    let mut token_list = ObjectData::new("DOMTokenList");
    token_list
        .properties
        .insert("value".to_string(), Value::Str(String::new()));
    data.properties.insert("classList".to_string(), Value::object(token_list));
    let mut dataset = ObjectData::new("DOMStringMap");
    dataset.properties.clear();
    data.properties.insert("dataset".to_string(), Value::object(dataset));
    Value::object(data)
}

/// Create a synthetic event object for handler simulation.
pub fn make_event(event_type: &str, key: Option<&str>) -> Value {
    let class = if key.is_some() { "KeyboardEvent" } else { "Event" };
    let mut data = ObjectData::new(class);
    data.properties
        .insert("type".to_string(), Value::Str(event_type.to_string()));
    if let Some(key) = key {
        data.properties.insert("key".to_string(), Value::Str(key.to_string()));
        data.properties
            .insert("keyCode".to_string(), Value::Number(legacy_key_code(key) as f64));
    }
    data.properties.insert("target".to_string(), make_element("div", ""));
    data.properties
        .insert("defaultPrevented".to_string(), Value::Bool(false));
    Value::object(data)
}

fn legacy_key_code(key: &str) -> u32 {
    match key {
        "Enter" => 13,
        "Escape" => 27,
        " " | "Space" => 32,
        "Tab" => 9,
        "ArrowLeft" => 37,
        "ArrowUp" => 38,
        "ArrowRight" => 39,
        "ArrowDown" => 40,
        "Home" => 36,
        "End" => 35,
        other => other.chars().next().map(|c| c as u32).unwrap_or(0),
    }
}

// ---- URI helpers ----

const UNRESERVED: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_.!~*'()";
const URI_EXTRA: &str = ";/?:@&=+$,#";

pub fn encode_uri_component(input: &str) -> String {
    percent_encode(input, UNRESERVED)
}

pub fn encode_uri(input: &str) -> String {
    let keep: String = format!("{}{}", UNRESERVED, URI_EXTRA);
    percent_encode(input, &keep)
}

fn percent_encode(input: &str, keep: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.as_bytes() {
        let c = *byte as char;
        if byte.is_ascii() && keep.contains(c) {
            out.push(c);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

pub fn decode_uri(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = &input[i + 1..i + 3];
            if let Ok(byte) = u8::from_str_radix(hex, 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
