//! FFI bindings for Temporal Twin
//!
//! C-compatible entry points for calling the correlation engine from other
//! languages. All functions use null-terminated C strings and return
//! allocated memory that must be freed by the caller with
//! `twin_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use uuid::Uuid;

use crate::schema::SampleAdapter;
use crate::service::{CorrelationService, StaticSymptomProvider};

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

/// Helper to convert a C string to a Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert a Rust string to a C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Engine version string. Caller must free with `twin_free_string`.
#[no_mangle]
pub extern "C" fn twin_version() -> *mut c_char {
    string_to_cstr(crate::TWIN_VERSION)
}

/// Run correlation analysis over raw JSON payloads.
///
/// * `patient_id` - UUID string identifying the patient
/// * `biometric_json` - JSON array of raw biometric samples
///   (twin.raw_sample.v1)
/// * `symptom_json` - JSON array of symptom series
/// * `lookback_days` / `correlation_threshold` - analysis bounds
///
/// Returns the report as a JSON string.
///
/// # Safety
/// - String arguments must be valid null-terminated C strings.
/// - The returned string must be freed with `twin_free_string`.
/// - Returns NULL on error; call `twin_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn twin_analyze_correlations(
    patient_id: *const c_char,
    biometric_json: *const c_char,
    symptom_json: *const c_char,
    lookback_days: u32,
    correlation_threshold: f64,
) -> *mut c_char {
    clear_last_error();

    let Some(patient_str) = cstr_to_string(patient_id) else {
        set_last_error("Invalid patient_id pointer");
        return ptr::null_mut();
    };
    let patient = match Uuid::parse_str(&patient_str) {
        Ok(id) => id,
        Err(e) => {
            set_last_error(&format!("Invalid patient_id: {e}"));
            return ptr::null_mut();
        }
    };
    let Some(biometric_str) = cstr_to_string(biometric_json) else {
        set_last_error("Invalid biometric_json pointer");
        return ptr::null_mut();
    };
    let Some(symptom_str) = cstr_to_string(symptom_json) else {
        set_last_error("Invalid symptom_json pointer");
        return ptr::null_mut();
    };

    let samples = match SampleAdapter::parse_array(&biometric_str) {
        Ok(samples) => samples,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };
    let grouped = match SampleAdapter::group_by_type(samples) {
        Ok(grouped) => grouped,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };
    let symptoms = match SampleAdapter::parse_symptom_series(&symptom_str) {
        Ok(series) => series,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let service = CorrelationService::new(StaticSymptomProvider::new(symptoms));
    let report =
        match service.analyze_correlations(patient, &grouped, lookback_days, correlation_threshold)
        {
            Ok(report) => report,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        };

    match report.to_json() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&format!("Failed to serialize report: {e}"));
            ptr::null_mut()
        }
    }
}

/// Last error message for this thread, or NULL if none.
/// Caller must free with `twin_free_string`.
#[no_mangle]
pub extern "C" fn twin_last_error() -> *mut c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(msg) => string_to_cstr(msg.to_str().unwrap_or("unknown error")),
        None => ptr::null_mut(),
    })
}

/// Free a string returned by any `twin_*` function.
///
/// # Safety
/// `ptr` must have been returned by this library and not freed already.
#[no_mangle]
pub unsafe extern "C" fn twin_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn call(
        patient: &str,
        biometric: &str,
        symptoms: &str,
        lookback: u32,
        threshold: f64,
    ) -> Option<String> {
        let patient = CString::new(patient).unwrap();
        let biometric = CString::new(biometric).unwrap();
        let symptoms = CString::new(symptoms).unwrap();
        unsafe {
            let out = twin_analyze_correlations(
                patient.as_ptr(),
                biometric.as_ptr(),
                symptoms.as_ptr(),
                lookback,
                threshold,
            );
            if out.is_null() {
                return None;
            }
            let s = CStr::from_ptr(out).to_str().unwrap().to_string();
            twin_free_string(out);
            Some(s)
        }
    }

    #[test]
    fn test_analyze_over_ffi() {
        let biometric = r#"[
            {"timestamp":"2024-01-01T08:00:00Z","value":62.0,"data_type":"heart_rate"},
            {"timestamp":"2024-01-02T08:00:00Z","value":64.0,"data_type":"heart_rate"}
        ]"#;
        let symptoms = r#"[{"symptom_type":"anxiety","observations":[]}]"#;

        let json = call(
            "7c9e6679-7425-40de-944b-e07fc1f90ae7",
            biometric,
            symptoms,
            30,
            0.3,
        )
        .unwrap();
        let report: serde_json::Value = serde_json::from_str(&json).unwrap();
        // Two samples: degrades to a low-reliability report
        assert_eq!(report["reliability"], "low");
        assert!(report["warning"].as_str().unwrap().starts_with("insufficient_data"));
    }

    #[test]
    fn test_invalid_patient_id_sets_error() {
        let result = call("not-a-uuid", "[]", "[]", 30, 0.3);
        assert!(result.is_none());
        unsafe {
            let err = twin_last_error();
            assert!(!err.is_null());
            let msg = CStr::from_ptr(err).to_str().unwrap().to_string();
            twin_free_string(err);
            assert!(msg.contains("Invalid patient_id"));
        }
    }

    #[test]
    fn test_empty_biometric_array_sets_error() {
        let result = call("7c9e6679-7425-40de-944b-e07fc1f90ae7", "[]", "[]", 30, 0.3);
        assert!(result.is_none());
        unsafe {
            let err = twin_last_error();
            let msg = CStr::from_ptr(err).to_str().unwrap().to_string();
            twin_free_string(err);
            assert!(msg.contains("Empty biometric data"));
        }
    }
}
