//! C FFI boundary for the linear discriminant analysis engine
//!
//! This crate provides C-compatible functions for calling training and apply
//! from the host's native extension layer.

mod types;

pub use types::*;

use lda_core::{
    fit_lda, ApplyOptions, ColumnData, LdaError, LdaOptions, MissingValuePolicy, NoopMonitor,
    RowProjector, Table,
};
use std::slice;

/// Name given to the class column of tables built from FFI arguments
const CLASS_COLUMN: &str = "__class__";

/// Convert LdaError to ErrorCode
fn error_to_code(err: &LdaError) -> ErrorCode {
    match err {
        LdaError::NoClasses { .. } => ErrorCode::NoClasses,
        LdaError::MissingValue { .. } => ErrorCode::MissingValue,
        LdaError::MissingColumn { .. } => ErrorCode::MissingColumn,
        LdaError::ZeroDimension { .. } => ErrorCode::ZeroDimension,
        LdaError::DimensionTooHigh { .. } => ErrorCode::DimensionTooHigh,
        LdaError::InvalidValue { .. } => ErrorCode::InvalidInput,
        LdaError::InvalidInput(_) => ErrorCode::InvalidInput,
        LdaError::EmptyInput { .. } => ErrorCode::InvalidInput,
        LdaError::DimensionMismatch { .. } => ErrorCode::DimensionMismatch,
        LdaError::SingularMatrix { .. } => ErrorCode::SingularMatrix,
        LdaError::EigenSolve(_) => ErrorCode::EigenSolveFailed,
        LdaError::Canceled => ErrorCode::Canceled,
    }
}

/// Write an error into `out_error` if it is not NULL
unsafe fn report(out_error: *mut LdaErrorFFI, code: ErrorCode, msg: &str) {
    if !out_error.is_null() {
        (*out_error).set(code, msg);
    }
}

/// Build a table from named numeric columns
///
/// # Safety
/// `columns` must point to `count` valid NamedColumn structs
unsafe fn columns_to_table(columns: *const NamedColumn, count: usize) -> Result<Table, String> {
    let mut table = Table::new();
    if count == 0 {
        return Ok(table);
    }
    for column in slice::from_raw_parts(columns, count) {
        if column.name.is_null() {
            return Err("column name is NULL".to_string());
        }
        if column.values.data.is_null() && column.values.len > 0 {
            return Err("column data is NULL".to_string());
        }
        let name = c_string(column.name)?;
        table
            .push_column(name, ColumnData::Numeric(column.values.to_vec()))
            .map_err(|e| e.to_string())?;
    }
    Ok(table)
}

/// Copy a slice into a malloc'd buffer
///
/// Returns NULL for an empty slice, and NULL on allocation failure otherwise.
unsafe fn malloc_copy(values: &[f64]) -> Result<*mut f64, ()> {
    if values.is_empty() {
        return Ok(std::ptr::null_mut());
    }
    let ptr = libc::malloc(std::mem::size_of_val(values)) as *mut f64;
    if ptr.is_null() {
        return Err(());
    }
    std::ptr::copy_nonoverlapping(values.as_ptr(), ptr, values.len());
    Ok(ptr)
}

/// Fit a discriminant model
///
/// # Safety
/// - `features` must point to `feature_count` valid NamedColumn structs
/// - `labels` must hold one entry per row, each NULL or a valid C string
/// - `out_model` must be a valid pointer; on success it receives a handle
///   that must be released with `lda_model_free`
/// - `out_error` can be NULL if error details are not needed
///
/// # Returns
/// `true` on success, `false` on error (check `out_error` for details)
#[no_mangle]
pub unsafe extern "C" fn lda_fit(
    features: *const NamedColumn,
    feature_count: usize,
    labels: LabelArray,
    options: LdaOptionsFFI,
    out_model: *mut *mut LdaModelHandle,
    out_error: *mut LdaErrorFFI,
) -> bool {
    // Initialize error
    if !out_error.is_null() {
        *out_error = LdaErrorFFI::success();
    }

    // Validate inputs
    if out_model.is_null() {
        report(out_error, ErrorCode::InvalidInput, "out_model is NULL");
        return false;
    }
    *out_model = std::ptr::null_mut();
    if features.is_null() && feature_count > 0 {
        report(out_error, ErrorCode::InvalidInput, "features is NULL");
        return false;
    }
    if labels.labels.is_null() && labels.len > 0 {
        report(out_error, ErrorCode::InvalidInput, "labels is NULL");
        return false;
    }

    let fit_result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let mut table = columns_to_table(features, feature_count)?;
        let feature_names: Vec<String> = table
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let values = labels.to_vec()?;
        table
            .push_column(
                CLASS_COLUMN,
                ColumnData::Nominal {
                    values,
                    domain: None,
                },
            )
            .map_err(|e| e.to_string())?;

        let opts = LdaOptions {
            class_column: CLASS_COLUMN.to_string(),
            feature_columns: feature_names,
            missing_policy: if options.skip_missing {
                MissingValuePolicy::Skip
            } else {
                MissingValuePolicy::Fail
            },
            dimension: (options.dimension > 0).then_some(options.dimension),
        };
        Ok::<_, String>(fit_lda(&table, &opts, &NoopMonitor))
    }));

    let fit_result = match fit_result {
        Ok(Ok(r)) => r,
        Ok(Err(msg)) => {
            report(out_error, ErrorCode::InvalidInput, &msg);
            return false;
        }
        Err(_) => {
            log::error!("panic caught at the FFI boundary in lda_fit");
            report(out_error, ErrorCode::InternalError, "Internal panic in LDA fit");
            return false;
        }
    };

    match fit_result {
        Ok(result) => {
            log::debug!(
                "lda_fit: {} observations, {} skipped, dimension {}",
                result.n_observations,
                result.n_skipped,
                result.model.dimension()
            );
            let handle = Box::new(LdaModelHandle {
                model: result.model,
            });
            *out_model = Box::into_raw(handle);
            true
        }
        Err(e) => {
            report(out_error, error_to_code(&e), &e.to_string());
            false
        }
    }
}

/// Number of output coordinates of a model (0 if `model` is NULL)
///
/// # Safety
/// `model` must be NULL or a handle returned by `lda_fit`
#[no_mangle]
pub unsafe extern "C" fn lda_model_dimension(model: *const LdaModelHandle) -> usize {
    if model.is_null() {
        return 0;
    }
    (*model).model.dimension()
}

/// Largest output dimension supported by a model's training data
///
/// # Safety
/// `model` must be NULL or a handle returned by `lda_fit`
#[no_mangle]
pub unsafe extern "C" fn lda_model_max_dimension(model: *const LdaModelHandle) -> usize {
    if model.is_null() {
        return 0;
    }
    (*model).model.max_dimension()
}

/// Copy the full ranked spectrum of a model
///
/// # Safety
/// - `model` must be a handle returned by `lda_fit`
/// - `out_spectrum` must be a valid pointer; release it with `lda_free_spectrum`
/// - `out_error` can be NULL
#[no_mangle]
pub unsafe extern "C" fn lda_model_spectrum(
    model: *const LdaModelHandle,
    out_spectrum: *mut SpectrumFFI,
    out_error: *mut LdaErrorFFI,
) -> bool {
    if !out_error.is_null() {
        *out_error = LdaErrorFFI::success();
    }
    if model.is_null() || out_spectrum.is_null() {
        report(
            out_error,
            ErrorCode::InvalidInput,
            "model or out_spectrum is NULL",
        );
        return false;
    }

    let model = &(*model).model;
    let snapshot = model.snapshot();

    let eigen_ptr = match malloc_copy(&snapshot.eigenvalues) {
        Ok(p) => p,
        Err(()) => {
            report(
                out_error,
                ErrorCode::AllocationFailure,
                "Failed to allocate eigenvalues",
            );
            return false;
        }
    };
    let vectors_ptr = match malloc_copy(&snapshot.matrix) {
        Ok(p) => p,
        Err(()) => {
            if !eigen_ptr.is_null() {
                libc::free(eigen_ptr as *mut libc::c_void);
            }
            report(
                out_error,
                ErrorCode::AllocationFailure,
                "Failed to allocate eigenvectors",
            );
            return false;
        }
    };

    *out_spectrum = SpectrumFFI {
        eigenvalues: eigen_ptr,
        vectors: vectors_ptr,
        n_eigen: snapshot.eigenvalues.len(),
        n_features: snapshot.feature_names.len(),
    };
    true
}

/// Project rows through a model
///
/// Columns are matched to the model's features by name. Rows with a missing
/// value get NaN coordinates unless `options.fail_on_missing` is set.
///
/// # Safety
/// - `model` must be a handle returned by `lda_fit`
/// - `columns` must point to `column_count` valid NamedColumn structs
/// - `out_projection` must be a valid pointer; release it with `lda_free_projection`
/// - `out_error` can be NULL
#[no_mangle]
pub unsafe extern "C" fn lda_transform(
    model: *const LdaModelHandle,
    columns: *const NamedColumn,
    column_count: usize,
    options: ApplyOptionsFFI,
    out_projection: *mut ProjectionFFI,
    out_error: *mut LdaErrorFFI,
) -> bool {
    if !out_error.is_null() {
        *out_error = LdaErrorFFI::success();
    }
    if model.is_null() || out_projection.is_null() {
        report(
            out_error,
            ErrorCode::InvalidInput,
            "model or out_projection is NULL",
        );
        return false;
    }
    if columns.is_null() && column_count > 0 {
        report(out_error, ErrorCode::InvalidInput, "columns is NULL");
        return false;
    }

    let model = &(*model).model;
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let table = columns_to_table(columns, column_count)?;
        let apply = ApplyOptions {
            dimension: (options.dimension > 0).then_some(options.dimension),
            remove_used_columns: false,
            fail_on_missing: options.fail_on_missing,
        };
        Ok::<_, String>(project_table(model, &table, &apply))
    }));

    let projected = match result {
        Ok(Ok(Ok(p))) => p,
        Ok(Ok(Err(e))) => {
            report(out_error, error_to_code(&e), &e.to_string());
            return false;
        }
        Ok(Err(msg)) => {
            report(out_error, ErrorCode::InvalidInput, &msg);
            return false;
        }
        Err(_) => {
            log::error!("panic caught at the FFI boundary in lda_transform");
            report(
                out_error,
                ErrorCode::InternalError,
                "Internal panic in LDA transform",
            );
            return false;
        }
    };

    let (values, n_rows, dimension) = projected;
    let values_ptr = match malloc_copy(&values) {
        Ok(p) => p,
        Err(()) => {
            report(
                out_error,
                ErrorCode::AllocationFailure,
                "Failed to allocate projection",
            );
            return false;
        }
    };

    *out_projection = ProjectionFFI {
        values: values_ptr,
        n_rows,
        dimension,
    };
    true
}

/// Project every row of `table` into a row-major buffer
fn project_table(
    model: &lda_core::TransformationModel,
    table: &Table,
    options: &ApplyOptions,
) -> Result<(Vec<f64>, usize, usize), LdaError> {
    let projector = RowProjector::bind(model, table, options)?;
    let k = projector.dimension();
    let n_rows = table.n_rows();
    let mut values = vec![f64::NAN; n_rows * k];
    let mut x = vec![0.0; model.n_features()];
    for (row, out) in values.chunks_mut(k).enumerate() {
        if !projector.project_row(row, &mut x, out)? {
            out.fill(f64::NAN);
        }
    }
    Ok((values, n_rows, k))
}

/// Release a model handle
///
/// # Safety
/// `model` must be NULL or a handle returned by `lda_fit`, not yet freed
#[no_mangle]
pub unsafe extern "C" fn lda_model_free(model: *mut LdaModelHandle) {
    if !model.is_null() {
        drop(Box::from_raw(model));
    }
}

/// Free memory allocated by lda_model_spectrum
///
/// # Safety
/// `spectrum` must be NULL or a pointer to a SpectrumFFI filled by lda_model_spectrum
#[no_mangle]
pub unsafe extern "C" fn lda_free_spectrum(spectrum: *mut SpectrumFFI) {
    if spectrum.is_null() {
        return;
    }
    if !(*spectrum).eigenvalues.is_null() {
        libc::free((*spectrum).eigenvalues as *mut libc::c_void);
        (*spectrum).eigenvalues = std::ptr::null_mut();
    }
    if !(*spectrum).vectors.is_null() {
        libc::free((*spectrum).vectors as *mut libc::c_void);
        (*spectrum).vectors = std::ptr::null_mut();
    }
}

/// Free memory allocated by lda_transform
///
/// # Safety
/// `projection` must be NULL or a pointer to a ProjectionFFI filled by lda_transform
#[no_mangle]
pub unsafe extern "C" fn lda_free_projection(projection: *mut ProjectionFFI) {
    if projection.is_null() {
        return;
    }
    if !(*projection).values.is_null() {
        libc::free((*projection).values as *mut libc::c_void);
        (*projection).values = std::ptr::null_mut();
    }
}

/// Get library version string
#[no_mangle]
pub extern "C" fn lda_version() -> *const libc::c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const libc::c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    struct Inputs {
        names: Vec<CString>,
        data: Vec<Vec<f64>>,
        labels: Vec<CString>,
    }

    impl Inputs {
        fn two_classes() -> Self {
            Self {
                names: vec![CString::new("f1").unwrap(), CString::new("f2").unwrap()],
                data: vec![
                    vec![0.1, -0.1, 0.0, 10.1, 9.9, 10.0],
                    vec![0.0, 0.1, -0.1, 10.0, 10.1, 9.9],
                ],
                labels: ["A", "A", "A", "B", "B", "B"]
                    .iter()
                    .map(|s| CString::new(*s).unwrap())
                    .collect(),
            }
        }

        fn columns(&self) -> Vec<NamedColumn> {
            self.names
                .iter()
                .zip(&self.data)
                .map(|(name, values)| NamedColumn {
                    name: name.as_ptr(),
                    values: DataArray {
                        data: values.as_ptr(),
                        validity: std::ptr::null(),
                        len: values.len(),
                    },
                })
                .collect()
        }

        fn label_ptrs(&self) -> Vec<*const libc::c_char> {
            self.labels.iter().map(|l| l.as_ptr()).collect()
        }
    }

    unsafe fn fit(inputs: &Inputs, options: LdaOptionsFFI) -> (*mut LdaModelHandle, LdaErrorFFI) {
        let columns = inputs.columns();
        let ptrs = inputs.label_ptrs();
        let labels = LabelArray {
            labels: ptrs.as_ptr(),
            len: ptrs.len(),
        };
        let mut model = std::ptr::null_mut();
        let mut error = LdaErrorFFI::success();
        lda_fit(
            columns.as_ptr(),
            columns.len(),
            labels,
            options,
            &mut model,
            &mut error,
        );
        (model, error)
    }

    #[test]
    fn test_fit_and_transform() {
        let inputs = Inputs::two_classes();
        unsafe {
            let options = LdaOptionsFFI {
                dimension: 0,
                skip_missing: false,
            };
            let (model, error) = fit(&inputs, options);
            assert_eq!(error.code, ErrorCode::Success);
            assert!(!model.is_null());
            assert_eq!(lda_model_dimension(model), 1);
            assert_eq!(lda_model_max_dimension(model), 1);

            let columns = inputs.columns();
            let mut projection = ProjectionFFI::default();
            let mut error = LdaErrorFFI::success();
            let ok = lda_transform(
                model,
                columns.as_ptr(),
                columns.len(),
                ApplyOptionsFFI {
                    dimension: 0,
                    fail_on_missing: true,
                },
                &mut projection,
                &mut error,
            );
            assert!(ok);
            assert_eq!(projection.n_rows, 6);
            assert_eq!(projection.dimension, 1);
            let values = slice::from_raw_parts(projection.values, 6);
            assert!((values[3] - values[0]).abs() > 10.0);

            lda_free_projection(&mut projection);
            assert!(projection.values.is_null());
            lda_model_free(model);
        }
    }

    #[test]
    fn test_spectrum() {
        let inputs = Inputs::two_classes();
        unsafe {
            let (model, _) = fit(
                &inputs,
                LdaOptionsFFI {
                    dimension: 0,
                    skip_missing: false,
                },
            );
            let mut spectrum = SpectrumFFI::default();
            assert!(lda_model_spectrum(model, &mut spectrum, std::ptr::null_mut()));
            assert_eq!(spectrum.n_eigen, 2);
            assert_eq!(spectrum.n_features, 2);
            let values = slice::from_raw_parts(spectrum.eigenvalues, 2);
            assert!(values[0] > values[1]);

            lda_free_spectrum(&mut spectrum);
            lda_model_free(model);
        }
    }

    #[test]
    fn test_fit_dimension_too_high() {
        let inputs = Inputs::two_classes();
        unsafe {
            let (model, error) = fit(
                &inputs,
                LdaOptionsFFI {
                    dimension: 2,
                    skip_missing: false,
                },
            );
            assert!(model.is_null());
            assert_eq!(error.code, ErrorCode::DimensionTooHigh);
        }
    }

    #[test]
    fn test_transform_missing_column() {
        let inputs = Inputs::two_classes();
        unsafe {
            let (model, _) = fit(
                &inputs,
                LdaOptionsFFI {
                    dimension: 0,
                    skip_missing: false,
                },
            );
            let columns = inputs.columns();
            let mut projection = ProjectionFFI::default();
            let mut error = LdaErrorFFI::success();
            let ok = lda_transform(
                model,
                columns.as_ptr(),
                1,
                ApplyOptionsFFI {
                    dimension: 0,
                    fail_on_missing: true,
                },
                &mut projection,
                &mut error,
            );
            assert!(!ok);
            assert_eq!(error.code, ErrorCode::MissingColumn);
            lda_model_free(model);
        }
    }

    #[test]
    fn test_fit_null_output() {
        let mut error = LdaErrorFFI::success();
        let ok = unsafe {
            lda_fit(
                std::ptr::null(),
                0,
                LabelArray {
                    labels: std::ptr::null(),
                    len: 0,
                },
                LdaOptionsFFI {
                    dimension: 0,
                    skip_missing: false,
                },
                std::ptr::null_mut(),
                &mut error,
            )
        };
        assert!(!ok);
        assert_eq!(error.code, ErrorCode::InvalidInput);
    }

    #[test]
    fn test_fit_empty_input_has_no_classes() {
        let mut model = std::ptr::null_mut();
        let mut error = LdaErrorFFI::success();
        let ok = unsafe {
            lda_fit(
                std::ptr::null(),
                0,
                LabelArray {
                    labels: std::ptr::null(),
                    len: 0,
                },
                LdaOptionsFFI {
                    dimension: 0,
                    skip_missing: false,
                },
                &mut model,
                &mut error,
            )
        };
        assert!(!ok);
        assert!(model.is_null());
        assert_eq!(error.code, ErrorCode::NoClasses);
    }
}
