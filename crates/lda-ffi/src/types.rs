//! C-compatible types for FFI boundary

use std::ffi::CStr;

use libc::c_char;

/// Error codes for FFI boundary
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,
    InvalidInput = 1,
    SingularMatrix = 2,
    EigenSolveFailed = 3,
    NoClasses = 4,
    MissingValue = 5,
    MissingColumn = 6,
    ZeroDimension = 7,
    DimensionTooHigh = 8,
    DimensionMismatch = 9,
    Canceled = 10,
    AllocationFailure = 11,
    InternalError = 99,
}

/// Error information for FFI
#[repr(C)]
pub struct LdaErrorFFI {
    pub code: ErrorCode,
    pub message: [c_char; 256],
}

impl LdaErrorFFI {
    pub fn success() -> Self {
        Self {
            code: ErrorCode::Success,
            message: [0; 256],
        }
    }

    pub fn set(&mut self, code: ErrorCode, msg: &str) {
        self.code = code;
        let bytes = msg.as_bytes();
        let len = bytes.len().min(255);
        for (i, &b) in bytes[..len].iter().enumerate() {
            self.message[i] = b as c_char;
        }
        self.message[len] = 0;
    }
}

/// Array of f64 values with validity mask for NULL handling
#[repr(C)]
pub struct DataArray {
    /// Pointer to data values
    pub data: *const f64,
    /// Validity bitmask: bit i is 1 if data[i] is valid, 0 if NULL
    /// Can be NULL if all values are valid
    pub validity: *const u8,
    /// Number of elements
    pub len: usize,
}

impl DataArray {
    /// Check if index i is valid (not NULL)
    ///
    /// # Safety
    /// Caller must ensure index is within bounds
    pub unsafe fn is_valid(&self, i: usize) -> bool {
        if self.validity.is_null() {
            return true;
        }
        let byte_idx = i / 8;
        let bit_idx = i % 8;
        ((*self.validity.add(byte_idx)) >> bit_idx) & 1 == 1
    }

    /// Convert to Vec<f64>, replacing NULL with NaN
    ///
    /// # Safety
    /// Caller must ensure pointers are valid and len is correct
    pub unsafe fn to_vec(&self) -> Vec<f64> {
        let mut result = Vec::with_capacity(self.len);
        for i in 0..self.len {
            if self.is_valid(i) {
                result.push(*self.data.add(i));
            } else {
                result.push(f64::NAN);
            }
        }
        result
    }
}

/// A named numeric column
#[repr(C)]
pub struct NamedColumn {
    /// NUL-terminated UTF-8 column name
    pub name: *const c_char,
    pub values: DataArray,
}

/// Array of class labels; a NULL entry marks a missing label
#[repr(C)]
pub struct LabelArray {
    pub labels: *const *const c_char,
    pub len: usize,
}

impl LabelArray {
    /// Convert to owned labels
    ///
    /// # Safety
    /// `labels` must point to `len` pointers, each NULL or a valid C string
    pub unsafe fn to_vec(&self) -> Result<Vec<Option<String>>, String> {
        let mut result = Vec::with_capacity(self.len);
        for i in 0..self.len {
            let ptr = *self.labels.add(i);
            if ptr.is_null() {
                result.push(None);
            } else {
                result.push(Some(c_string(ptr)?));
            }
        }
        Ok(result)
    }
}

/// Copy a NUL-terminated UTF-8 string
///
/// # Safety
/// `ptr` must be a valid, NUL-terminated C string
pub unsafe fn c_string(ptr: *const c_char) -> Result<String, String> {
    CStr::from_ptr(ptr)
        .to_str()
        .map(str::to_string)
        .map_err(|e| format!("invalid UTF-8 in string argument: {}", e))
}

/// Training options
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct LdaOptionsFFI {
    /// Number of directions kept in the model (0 = maximum feasible)
    pub dimension: usize,
    /// Skip rows with missing values instead of failing
    pub skip_missing: bool,
}

/// Apply options
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ApplyOptionsFFI {
    /// Output dimension (0 = the model's dimension)
    pub dimension: usize,
    /// Fail on a missing input value instead of emitting a NaN projection
    pub fail_on_missing: bool,
}

/// Opaque handle to a trained model
pub struct LdaModelHandle {
    pub(crate) model: lda_core::TransformationModel,
}

/// Full ranked spectrum of a model
#[repr(C)]
pub struct SpectrumFFI {
    /// Eigenvalues, descending (`n_eigen` values)
    pub eigenvalues: *mut f64,
    /// Eigenvectors, one per row (`n_eigen x n_features`, row-major)
    pub vectors: *mut f64,
    pub n_eigen: usize,
    pub n_features: usize,
}

impl Default for SpectrumFFI {
    fn default() -> Self {
        Self {
            eigenvalues: std::ptr::null_mut(),
            vectors: std::ptr::null_mut(),
            n_eigen: 0,
            n_features: 0,
        }
    }
}

/// Projected rows
#[repr(C)]
pub struct ProjectionFFI {
    /// `n_rows x dimension`, row-major; NaN rows were not projected
    pub values: *mut f64,
    pub n_rows: usize,
    pub dimension: usize,
}

impl Default for ProjectionFFI {
    fn default() -> Self {
        Self {
            values: std::ptr::null_mut(),
            n_rows: 0,
            dimension: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_truncated() {
        let mut err = LdaErrorFFI::success();
        let long = "x".repeat(400);
        err.set(ErrorCode::InvalidInput, &long);
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert_eq!(err.message[254], b'x' as c_char);
        assert_eq!(err.message[255], 0);
    }

    #[test]
    fn test_data_array_validity() {
        let data = [1.0, 2.0, 3.0];
        let validity = [0b101u8];
        let arr = DataArray {
            data: data.as_ptr(),
            validity: validity.as_ptr(),
            len: 3,
        };
        let values = unsafe { arr.to_vec() };
        assert_eq!(values[0], 1.0);
        assert!(values[1].is_nan());
        assert_eq!(values[2], 3.0);
    }

    #[test]
    fn test_label_array() {
        let a = b"setosa\0";
        let ptrs = [a.as_ptr() as *const c_char, std::ptr::null()];
        let labels = LabelArray {
            labels: ptrs.as_ptr(),
            len: 2,
        };
        let values = unsafe { labels.to_vec() }.unwrap();
        assert_eq!(values, vec![Some("setosa".to_string()), None]);
    }
}
