//! Building and reading COM `VARIANT`s.
//!
//! The union fields are wrapped in `ManuallyDrop`, so writes go through
//! `ptr::write` rather than assignment.

#![cfg(windows)]

use std::mem::ManuallyDrop;
use std::ptr;

use windows::{
    core::BSTR,
    Win32::{
        Foundation::{DISP_E_PARAMNOTFOUND, VARIANT_BOOL},
        System::{
            Com::IDispatch,
            Variant::{
                VARENUM, VARIANT, VT_BOOL, VT_BSTR, VT_DATE, VT_DISPATCH, VT_EMPTY, VT_ERROR,
                VT_I2, VT_I4, VT_NULL, VT_R4, VT_R8,
            },
        },
    },
};

use sheetprobe_protocol::{CellError, CellValue};

fn with_vt(vt: VARENUM, fill: impl FnOnce(&mut VARIANT)) -> VARIANT {
    let mut v = VARIANT::default();
    fill(&mut v);
    unsafe {
        ptr::write(&mut (*v.Anonymous.Anonymous).vt, vt);
    }
    v
}

pub fn empty() -> VARIANT {
    VARIANT::default()
}

pub fn from_bool(val: bool) -> VARIANT {
    with_vt(VT_BOOL, |v| unsafe {
        ptr::write(
            &mut (*v.Anonymous.Anonymous).Anonymous.boolVal,
            VARIANT_BOOL(if val { -1 } else { 0 }),
        );
    })
}

pub fn from_f64(val: f64) -> VARIANT {
    with_vt(VT_R8, |v| unsafe {
        ptr::write(&mut (*v.Anonymous.Anonymous).Anonymous.dblVal, val);
    })
}

pub fn from_i32(val: i32) -> VARIANT {
    with_vt(VT_I4, |v| unsafe {
        ptr::write(&mut (*v.Anonymous.Anonymous).Anonymous.lVal, val);
    })
}

pub fn from_str(val: &str) -> VARIANT {
    with_vt(VT_BSTR, |v| unsafe {
        ptr::write(
            &mut (*v.Anonymous.Anonymous).Anonymous.bstrVal,
            ManuallyDrop::new(BSTR::from(val)),
        );
    })
}

/// An object argument (e.g. the `After:=` sheet of `Worksheets.Add`).
pub fn from_dispatch(disp: &IDispatch) -> VARIANT {
    with_vt(VT_DISPATCH, |v| unsafe {
        ptr::write(
            &mut (*v.Anonymous.Anonymous).Anonymous.pdispVal,
            ManuallyDrop::new(Some(disp.clone())),
        );
    })
}

/// An omitted optional argument.
pub fn missing() -> VARIANT {
    with_vt(VT_ERROR, |v| unsafe {
        ptr::write(
            &mut (*v.Anonymous.Anonymous).Anonymous.scode,
            DISP_E_PARAMNOTFOUND.0,
        );
    })
}

pub fn vt(v: &VARIANT) -> VARENUM {
    unsafe { v.Anonymous.Anonymous.vt }
}

pub fn is_empty(v: &VARIANT) -> bool {
    let t = vt(v);
    t == VT_EMPTY || t == VT_NULL
}

pub fn get_bool(v: &VARIANT) -> Option<bool> {
    (vt(v) == VT_BOOL).then(|| unsafe { v.Anonymous.Anonymous.Anonymous.boolVal.0 != 0 })
}

/// Numbers of any width; dates come back as their serial value.
pub fn get_f64(v: &VARIANT) -> Option<f64> {
    let t = vt(v);
    unsafe {
        let anon = &v.Anonymous.Anonymous.Anonymous;
        if t == VT_R8 {
            Some(anon.dblVal)
        } else if t == VT_DATE {
            Some(anon.date)
        } else if t == VT_R4 {
            Some(anon.fltVal as f64)
        } else if t == VT_I4 {
            Some(anon.lVal as f64)
        } else if t == VT_I2 {
            Some(anon.iVal as f64)
        } else {
            None
        }
    }
}

pub fn get_i32(v: &VARIANT) -> Option<i32> {
    let t = vt(v);
    unsafe {
        let anon = &v.Anonymous.Anonymous.Anonymous;
        if t == VT_I4 {
            Some(anon.lVal)
        } else if t == VT_I2 {
            Some(anon.iVal as i32)
        } else if t == VT_R8 {
            Some(anon.dblVal as i32)
        } else {
            None
        }
    }
}

pub fn get_string(v: &VARIANT) -> Option<String> {
    (vt(v) == VT_BSTR).then(|| unsafe { v.Anonymous.Anonymous.Anonymous.bstrVal.to_string() })
}

pub fn get_dispatch(v: &VARIANT) -> Option<IDispatch> {
    if vt(v) != VT_DISPATCH {
        return None;
    }
    unsafe {
        let disp: &Option<IDispatch> = &v.Anonymous.Anonymous.Anonymous.pdispVal;
        disp.clone()
    }
}

/// Excel reports `#DIV/0!` and friends as `VT_ERROR` with `0x800A0000 | xlErr`.
fn error_code(v: &VARIANT) -> Option<&'static str> {
    if vt(v) != VT_ERROR {
        return None;
    }
    let scode = unsafe { v.Anonymous.Anonymous.Anonymous.scode };
    let code = match scode & 0xFFFF {
        2000 => "#NULL!",
        2007 => "#DIV/0!",
        2015 => "#VALUE!",
        2023 => "#REF!",
        2029 => "#NAME?",
        2036 => "#NUM!",
        2042 => "#N/A",
        _ => "#ERROR",
    };
    Some(code)
}

pub fn to_cell_value(v: &VARIANT) -> CellValue {
    if is_empty(v) {
        CellValue::Empty
    } else if let Some(b) = get_bool(v) {
        CellValue::Bool(b)
    } else if let Some(n) = get_f64(v) {
        CellValue::Number(n)
    } else if let Some(s) = get_string(v) {
        CellValue::Text(s)
    } else if let Some(code) = error_code(v) {
        CellValue::Error(CellError::new(code))
    } else {
        CellValue::Empty
    }
}

/// Error values cannot be written; they clear the cell.
pub fn from_cell_value(value: &CellValue) -> VARIANT {
    match value {
        CellValue::Empty | CellValue::Error(_) => empty(),
        CellValue::Bool(b) => from_bool(*b),
        CellValue::Number(n) => from_f64(*n),
        CellValue::Text(s) => from_str(s),
    }
}
