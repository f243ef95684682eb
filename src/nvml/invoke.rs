//! Uniform invocation of table entries
//!
//! Every native call goes through [`Invoker`], which turns the returned
//! `nvmlReturn_t` into a [`CallError`] rendered by the library's own
//! `nvmlErrorString`, and implements the two-phase size-query protocol used
//! by list-returning queries.

use crate::error::{CallError, NvmlError};
use crate::nvml::marshal::NativeLayout;
use crate::nvml::status::{self, Status};
use crate::nvml::table::{Entry, FunctionTable};

use std::ffi::{c_uint, CStr};
use std::ptr;

/// Upper bound on data calls in one enumeration when the list keeps growing
pub const MAX_ENUMERATE_ATTEMPTS: usize = 3;

/// Performs calls against one resolved [`FunctionTable`]
#[derive(Clone, Copy)]
pub struct Invoker<'t> {
    table: &'t FunctionTable,
}

impl<'t> Invoker<'t> {
    pub fn new(table: &'t FunctionTable) -> Self {
        Self { table }
    }

    /// Render a status code with `nvmlErrorString`
    ///
    /// Never fails. A missing translator or a null/empty result degrades to
    /// `"unknown error <code>"`.
    pub fn error_string(&self, code: Status) -> String {
        let fallback = || format!("unknown error {}", code);

        let Ok(translate) = self.table.error_string.get() else {
            return fallback();
        };

        // SAFETY: nvmlErrorString accepts any code and returns either null or
        // a pointer to a static NUL-terminated string.
        let message = unsafe {
            let raw = translate(code);
            if raw.is_null() {
                return fallback();
            }
            CStr::from_ptr(raw).to_string_lossy().into_owned()
        };

        if message.is_empty() {
            fallback()
        } else {
            message
        }
    }

    /// Map a returned status to `Ok` or a rendered [`CallError`]
    pub fn check_status(&self, code: Status, symbol: &'static str) -> Result<(), CallError> {
        if code == status::SUCCESS {
            return Ok(());
        }
        Err(self.call_error(code, symbol))
    }

    fn call_error(&self, code: Status, symbol: &'static str) -> CallError {
        let err = CallError {
            code,
            message: self.error_string(code),
            symbol,
        };
        log::debug!("{}", err);
        err
    }

    /// Call a resolved entry and check its status
    ///
    /// `invoke` receives the typed function pointer and performs the actual
    /// call with its arguments; the returned status is checked here.
    pub fn call<F, C>(&self, entry: &Entry<F>, invoke: C) -> Result<(), NvmlError>
    where
        F: Copy,
        C: FnOnce(F) -> Status,
    {
        let func = entry.get()?;
        let code = invoke(func);
        self.check_status(code, entry.symbol())?;
        Ok(())
    }

    /// Run the size-query protocol for a list-returning query
    ///
    /// `invoke` is called with the typed pointer, a count in/out pointer and
    /// an element buffer. The first call passes a count of zero and a null
    /// buffer. `SUCCESS` with a count of zero means the list is empty;
    /// `INSUFFICIENT_SIZE` means `count` now holds the required length, so a
    /// zeroed buffer of that length is allocated and the call repeated. Some
    /// queries report the length with `SUCCESS` instead, which is handled the
    /// same way. If the list grew in
    /// between and the data call reports `INSUFFICIENT_SIZE` again, the data
    /// call is retried with the new size up to [`MAX_ENUMERATE_ATTEMPTS`]
    /// times. The result is truncated to the count the data call wrote.
    pub fn enumerate<F, T, C>(&self, entry: &Entry<F>, mut invoke: C) -> Result<Vec<T>, NvmlError>
    where
        F: Copy,
        T: NativeLayout,
        C: FnMut(F, *mut c_uint, *mut T) -> Status,
    {
        let func = entry.get()?;
        let symbol = entry.symbol();

        let mut count: c_uint = 0;
        match invoke(func, &mut count, ptr::null_mut()) {
            status::SUCCESS if count == 0 => return Ok(Vec::new()),
            status::SUCCESS | status::INSUFFICIENT_SIZE => {}
            code => return Err(self.fail(code, symbol)),
        }

        for attempt in 1..=MAX_ENUMERATE_ATTEMPTS {
            let mut items = vec![T::zeroed(); count as usize];
            let mut written = count;

            match invoke(func, &mut written, items.as_mut_ptr()) {
                status::SUCCESS => {
                    items.truncate(written as usize);
                    return Ok(items);
                }
                status::INSUFFICIENT_SIZE if attempt < MAX_ENUMERATE_ATTEMPTS => {
                    log::debug!(
                        "{} needs {} entries after sizing for {}, retrying",
                        symbol,
                        written,
                        count
                    );
                    count = written.max(count.saturating_add(1));
                }
                code => return Err(self.fail(code, symbol)),
            }
        }

        Err(self.fail(status::INSUFFICIENT_SIZE, symbol))
    }

    fn fail(&self, code: Status, symbol: &'static str) -> NvmlError {
        self.call_error(code, symbol).into()
    }
}
