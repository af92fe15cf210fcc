//! Late-bound `IDispatch` calls: the VBScript view of Excel's object model.

#![cfg(windows)]

use windows::{
    core::{IUnknown, Interface, GUID, HSTRING, PCWSTR},
    Win32::{
        Foundation::DISP_E_EXCEPTION,
        Globalization::GetSystemDefaultLCID,
        System::{
            Com::{
                CLSIDFromProgID, CoCreateInstance, IDispatch, CLSCTX_LOCAL_SERVER, DISPATCH_FLAGS,
                DISPATCH_METHOD, DISPATCH_PROPERTYGET, DISPATCH_PROPERTYPUT, DISPPARAMS, EXCEPINFO,
            },
            Ole::{GetActiveObject, DISPID_PROPERTYPUT},
            Variant::VARIANT,
        },
    },
};

use crate::variant;

#[derive(Clone)]
pub struct Dispatch {
    inner: IDispatch,
}

impl Dispatch {
    /// Bind the running instance registered for `progid`, if any.
    pub fn running(progid: &str) -> Result<Option<Self>, String> {
        unsafe {
            let clsid = CLSIDFromProgID(&HSTRING::from(progid))
                .map_err(|e| format!("CLSIDFromProgID('{progid}') failed: {e}"))?;
            let mut unknown: Option<IUnknown> = None;
            if GetActiveObject(&clsid, None, &mut unknown).is_err() {
                return Ok(None);
            }
            match unknown {
                Some(unknown) => {
                    let inner = unknown
                        .cast::<IDispatch>()
                        .map_err(|e| format!("running '{progid}' is not automatable: {e}"))?;
                    Ok(Some(Self { inner }))
                }
                None => Ok(None),
            }
        }
    }

    /// Start a new out-of-process instance of `progid`.
    pub fn launch(progid: &str) -> Result<Self, String> {
        unsafe {
            let clsid = CLSIDFromProgID(&HSTRING::from(progid))
                .map_err(|e| format!("CLSIDFromProgID('{progid}') failed: {e}"))?;
            let inner: IDispatch = CoCreateInstance(&clsid, None, CLSCTX_LOCAL_SERVER)
                .map_err(|e| format!("CoCreateInstance('{progid}') failed: {e}"))?;
            Ok(Self { inner })
        }
    }

    pub fn raw(&self) -> &IDispatch {
        &self.inner
    }

    fn dispid(&self, name: &str) -> Result<i32, String> {
        let wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
        let names = [PCWSTR(wide.as_ptr())];
        let mut dispid = 0i32;
        unsafe {
            self.inner
                .GetIDsOfNames(
                    &GUID::zeroed(),
                    names.as_ptr(),
                    1,
                    GetSystemDefaultLCID(),
                    &mut dispid,
                )
                .map_err(|e| format!("unknown member '{name}': {e}"))?;
        }
        Ok(dispid)
    }

    /// Every call funnels through here. `args` are in source order; DISPPARAMS
    /// wants them reversed.
    fn invoke(&self, name: &str, flags: DISPATCH_FLAGS, args: &[VARIANT]) -> Result<VARIANT, String> {
        let dispid = self.dispid(name)?;
        let mut reversed: Vec<VARIANT> = args.iter().rev().cloned().collect();
        let mut put_id = [DISPID_PROPERTYPUT];
        let is_put = flags == DISPATCH_PROPERTYPUT;
        let params = DISPPARAMS {
            rgvarg: if reversed.is_empty() {
                std::ptr::null_mut()
            } else {
                reversed.as_mut_ptr()
            },
            rgdispidNamedArgs: if is_put {
                put_id.as_mut_ptr()
            } else {
                std::ptr::null_mut()
            },
            cArgs: reversed.len() as u32,
            cNamedArgs: u32::from(is_put),
        };

        let mut result = VARIANT::default();
        let mut except = EXCEPINFO::default();
        unsafe {
            self.inner
                .Invoke(
                    dispid,
                    &GUID::zeroed(),
                    GetSystemDefaultLCID(),
                    flags,
                    &params,
                    if is_put { None } else { Some(&mut result) },
                    Some(&mut except),
                    None,
                )
                .map_err(|e| describe_failure(e, &except, name))?;
        }
        Ok(result)
    }

    /// `obj.Name`
    pub fn get(&self, name: &str) -> Result<VARIANT, String> {
        self.invoke(name, DISPATCH_PROPERTYGET, &[])
    }

    /// `obj.Name(args...)` as a property read, e.g. `Cells(3, 2)`.
    pub fn get_with(&self, name: &str, args: &[VARIANT]) -> Result<VARIANT, String> {
        self.invoke(name, DISPATCH_PROPERTYGET, args)
    }

    /// `obj.Name = value`
    pub fn put(&self, name: &str, value: VARIANT) -> Result<(), String> {
        self.invoke(name, DISPATCH_PROPERTYPUT, &[value]).map(|_| ())
    }

    /// `obj.Name(args...)` as a method call.
    pub fn call(&self, name: &str, args: &[VARIANT]) -> Result<VARIANT, String> {
        self.invoke(name, DISPATCH_METHOD, args)
    }

    pub fn child(&self, name: &str) -> Result<Dispatch, String> {
        as_object(self.get(name)?, name)
    }

    pub fn child_with(&self, name: &str, args: &[VARIANT]) -> Result<Dispatch, String> {
        as_object(self.get_with(name, args)?, name)
    }

    pub fn call_child(&self, name: &str, args: &[VARIANT]) -> Result<Dispatch, String> {
        as_object(self.call(name, args)?, name)
    }

    pub fn get_string(&self, name: &str) -> Result<String, String> {
        let v = self.get(name)?;
        Ok(variant::get_string(&v).unwrap_or_default())
    }

    pub fn get_i32(&self, name: &str) -> Result<i32, String> {
        let v = self.get(name)?;
        variant::get_i32(&v).ok_or_else(|| format!("'{name}' is not an integer"))
    }

    /// Items `1..=Count` of a COM collection.
    pub fn items(&self) -> Result<Vec<Dispatch>, String> {
        let count = self.get_i32("Count")?;
        (1..=count)
            .map(|i| self.child_with("Item", &[variant::from_i32(i)]))
            .collect()
    }
}

fn as_object(v: VARIANT, member: &str) -> Result<Dispatch, String> {
    match variant::get_dispatch(&v) {
        Some(inner) => Ok(Dispatch { inner }),
        None if variant::is_empty(&v) => Err(format!("'{member}' returned nothing")),
        None => Err(format!(
            "'{member}' returned VT={} where an object was expected",
            variant::vt(&v).0
        )),
    }
}

fn describe_failure(err: windows::core::Error, except: &EXCEPINFO, member: &str) -> String {
    if err.code() != DISP_E_EXCEPTION {
        return format!("{member} failed: {err}");
    }
    let text = |b: &windows::core::BSTR, fallback: &str| {
        if b.is_empty() {
            fallback.to_string()
        } else {
            b.to_string()
        }
    };
    format!(
        "{member} raised: {} ({})",
        text(&except.bstrDescription, "no description"),
        text(&except.bstrSource, "unknown source")
    )
}
