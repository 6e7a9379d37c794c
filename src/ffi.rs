//! FFI interface for C/C++ callers
//!
//! Rulesets go in and results come out as JSON text.

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use serde::Serialize;

use crate::config::parse_ruleset;
use crate::extractor::Extractor;

/// Result struct returned to C++
/// Both pointers are owned by Rust and must be freed via free_extraction_result
#[repr(C)]
pub struct ExtractionResultFFI {
    /// JSON-serialized result (null-terminated)
    pub json_ptr: *mut c_char,
    /// Error message if extraction failed (null-terminated), or null on success
    pub error_ptr: *mut c_char,
}

/// Extract structured data from HTML with a JSON ruleset.
///
/// On success `json_ptr` holds `{"value": ..., "failures": [...]}`.
/// Malformed rulesets are reported through `error_ptr`; failed
/// transformations are not errors and appear in `failures`.
///
/// # Safety
/// - `html_ptr` must point to valid memory of at least `html_len` bytes
/// - `ruleset_json` must be a valid null-terminated C string
/// - Caller must free the result via `free_extraction_result`
#[no_mangle]
pub unsafe extern "C" fn extract_structured_ffi(
    html_ptr: *const c_char,
    html_len: usize,
    ruleset_json: *const c_char,
) -> ExtractionResultFFI {
    let html = match read_html(html_ptr, html_len) {
        Ok(html) => html,
        Err(msg) => return make_error_result(msg),
    };

    let ruleset = if ruleset_json.is_null() {
        return make_error_result("Ruleset JSON is null");
    } else {
        match CStr::from_ptr(ruleset_json).to_str() {
            Ok(s) => s,
            Err(_) => return make_error_result("Invalid UTF-8 in ruleset JSON"),
        }
    };

    let extractor = match parse_ruleset(ruleset).and_then(|rule| Extractor::new(&rule)) {
        Ok(extractor) => extractor,
        Err(e) => return make_error_result(&e.to_string()),
    };

    let document = scraper::Html::parse_document(html);
    make_json_result(&extractor.extract_with_report(&document))
}

/// Free an ExtractionResultFFI returned by extract_structured_ffi
///
/// # Safety
/// - `result` must have been returned by `extract_structured_ffi`
/// - Must only be called once per result
#[no_mangle]
pub unsafe extern "C" fn free_extraction_result(result: ExtractionResultFFI) {
    if !result.json_ptr.is_null() {
        drop(CString::from_raw(result.json_ptr));
    }
    if !result.error_ptr.is_null() {
        drop(CString::from_raw(result.error_ptr));
    }
}

unsafe fn read_html<'a>(html_ptr: *const c_char, html_len: usize) -> Result<&'a str, &'static str> {
    if html_ptr.is_null() || html_len == 0 {
        return Ok("");
    }
    let slice = std::slice::from_raw_parts(html_ptr as *const u8, html_len);
    std::str::from_utf8(slice).map_err(|_| "Invalid UTF-8 in HTML content")
}

fn make_json_result<T: Serialize>(result: &T) -> ExtractionResultFFI {
    match serde_json::to_string(result) {
        Ok(json) => match CString::new(json) {
            Ok(cstr) => ExtractionResultFFI {
                json_ptr: cstr.into_raw(),
                error_ptr: ptr::null_mut(),
            },
            Err(_) => make_error_result("Result JSON contains null bytes"),
        },
        Err(e) => make_error_result(&format!("Failed to serialize result: {}", e)),
    }
}

// Helper to create error result
fn make_error_result(msg: &str) -> ExtractionResultFFI {
    let error_cstr = CString::new(msg.replace('\0', " ")).unwrap_or_default();
    ExtractionResultFFI {
        json_ptr: ptr::null_mut(),
        error_ptr: error_cstr.into_raw(),
    }
}
