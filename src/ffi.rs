//! FFI bindings for FitLog analytics
//!
//! This module provides C-compatible functions for calling the engine from the
//! mobile and web hosts. All functions use C strings (null-terminated) and
//! return allocated memory that must be freed by the caller using
//! `fitlog_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::facade::AnalyticsFacade;
use crate::nutrition::NutritionAggregator;
use crate::schema::parse_date;
use crate::types::DetectionBaseline;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Return the JSON as a C string, or record the error and return NULL
fn finish(result: Result<String, EngineError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Analyze a snapshot with the default configuration.
///
/// `today` is the caller's current date as `YYYY-MM-DD`.
///
/// # Safety
/// - `snapshot_json` and `today` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `fitlog_free_string`.
/// - Returns NULL on error; call `fitlog_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn fitlog_analyze(
    snapshot_json: *const c_char,
    today: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_string(snapshot_json) else {
        set_last_error("Invalid snapshot string pointer");
        return ptr::null_mut();
    };
    let Some(today_str) = cstr_to_string(today) else {
        set_last_error("Invalid date string pointer");
        return ptr::null_mut();
    };

    finish(parse_date(&today_str).and_then(|today| {
        AnalyticsFacade::default().analyze_json(&json_str, today)
    }))
}

/// Scale a detected food item to a new portion.
///
/// `baseline_json` is `{"portion_grams", "calories", "protein_g", "carbs_g", "fats_g"}`.
///
/// # Safety
/// - `baseline_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `fitlog_free_string`.
/// - Returns NULL on error; call `fitlog_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn fitlog_scale_portion(
    baseline_json: *const c_char,
    new_portion_grams: f64,
) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_string(baseline_json) else {
        set_last_error("Invalid baseline string pointer");
        return ptr::null_mut();
    };

    finish((|| -> Result<String, EngineError> {
        let baseline: DetectionBaseline = serde_json::from_str(&json_str)?;
        let scaled = NutritionAggregator::default().scale_portion(&baseline, new_portion_grams)?;
        Ok(serde_json::to_string(&scaled)?)
    })())
}

// ============================================================================
// Configured Engine API
// ============================================================================

/// Opaque handle to a configured AnalyticsFacade
pub struct FitlogEngineHandle {
    facade: AnalyticsFacade,
}

/// Create an engine from a JSON configuration (NULL for defaults).
///
/// # Safety
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Must be freed with `fitlog_engine_free`.
/// - Returns NULL on error; call `fitlog_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn fitlog_engine_new(config_json: *const c_char) -> *mut FitlogEngineHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        Ok(EngineConfig::default())
    } else {
        match cstr_to_string(config_json) {
            Some(json) => EngineConfig::from_json(&json),
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        }
    };

    match config {
        Ok(config) => Box::into_raw(Box::new(FitlogEngineHandle {
            facade: AnalyticsFacade::new(config),
        })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free an engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `fitlog_engine_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn fitlog_engine_free(engine: *mut FitlogEngineHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Analyze a snapshot with a configured engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `fitlog_engine_new`.
/// - `snapshot_json` and `today` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `fitlog_free_string`.
/// - Returns NULL on error; call `fitlog_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn fitlog_engine_analyze(
    engine: *const FitlogEngineHandle,
    snapshot_json: *const c_char,
    today: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }
    let handle = &*engine;

    let Some(json_str) = cstr_to_string(snapshot_json) else {
        set_last_error("Invalid snapshot string pointer");
        return ptr::null_mut();
    };
    let Some(today_str) = cstr_to_string(today) else {
        set_last_error("Invalid date string pointer");
        return ptr::null_mut();
    };

    finish(parse_date(&today_str).and_then(|today| handle.facade.analyze_json(&json_str, today)))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by FitLog functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a FitLog function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn fitlog_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next FitLog function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn fitlog_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn fitlog_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
