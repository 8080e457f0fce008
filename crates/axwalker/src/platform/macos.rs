//! Live accessibility tree through the ApplicationServices C API.

use std::ffi::c_void;
use std::process::Command;
use std::ptr;

use axtree::{AxError, Element, ElementValue, Role, WriteValue};
use core_foundation::array::{CFArray, CFArrayRef};
use core_foundation::base::{CFType, CFTypeRef, TCFType};
use core_foundation::boolean::CFBoolean;
use core_foundation::number::CFNumber;
use core_foundation::string::{CFString, CFStringRef};
use tracing::{debug, trace};

use crate::host::Host;

type AXUIElementRef = *const c_void;
type AXErrorCode = i32;

const AX_SUCCESS: AXErrorCode = 0;
const AX_ATTRIBUTE_UNSUPPORTED: AXErrorCode = -25205;
const AX_API_DISABLED: AXErrorCode = -25211;

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn AXIsProcessTrusted() -> u8;
    fn AXUIElementCreateApplication(pid: i32) -> AXUIElementRef;
    fn AXUIElementCopyAttributeValue(
        element: AXUIElementRef,
        attribute: CFStringRef,
        value: *mut CFTypeRef,
    ) -> AXErrorCode;
    fn AXUIElementSetAttributeValue(
        element: AXUIElementRef,
        attribute: CFStringRef,
        value: CFTypeRef,
    ) -> AXErrorCode;
    fn AXUIElementSetMessagingTimeout(element: AXUIElementRef, seconds: f32) -> AXErrorCode;
}

/// One retained `AXUIElementRef`. Dropping it releases the reference.
#[derive(Clone)]
pub struct AxElement(CFType);

impl AxElement {
    fn raw(&self) -> AXUIElementRef {
        self.0.as_CFTypeRef()
    }

    fn copy_attribute(&self, name: &'static str) -> Option<CFType> {
        let attribute = CFString::from_static_string(name);
        let mut value: CFTypeRef = ptr::null();
        let code = unsafe {
            AXUIElementCopyAttributeValue(self.raw(), attribute.as_concrete_TypeRef(), &mut value)
        };
        if code != AX_SUCCESS || value.is_null() {
            trace!(attribute = name, code, "attribute unavailable");
            return None;
        }
        // Copy* functions hand over a +1 reference.
        Some(unsafe { CFType::wrap_under_create_rule(value) })
    }

    fn string_attribute(&self, name: &'static str) -> Option<String> {
        self.copy_attribute(name)?
            .downcast::<CFString>()
            .map(|s| s.to_string())
    }

    fn element_array(&self, name: &'static str) -> Vec<AxElement> {
        let Some(value) = self.copy_attribute(name) else {
            return Vec::new();
        };
        if value.type_of() != CFArray::<CFType>::type_id() {
            return Vec::new();
        }
        let array: CFArray<CFType> =
            unsafe { CFArray::wrap_under_get_rule(value.as_CFTypeRef() as CFArrayRef) };
        array.iter().map(|item| AxElement((*item).clone())).collect()
    }
}

impl Element for AxElement {
    fn role(&self) -> Option<Role> {
        self.string_attribute("AXRole").map(|r| Role::from_ax(&r))
    }

    fn title(&self) -> Option<String> {
        self.string_attribute("AXTitle")
    }

    fn description(&self) -> Option<String> {
        self.string_attribute("AXDescription")
    }

    fn value(&self) -> Option<ElementValue> {
        let value = self.copy_attribute("AXValue")?;
        if let Some(flag) = value.downcast::<CFBoolean>() {
            return Some(ElementValue::Bool(flag.into()));
        }
        if let Some(number) = value.downcast::<CFNumber>() {
            return number.to_f64().map(ElementValue::Number);
        }
        value
            .downcast::<CFString>()
            .map(|s| ElementValue::Text(s.to_string()))
    }

    fn children(&self) -> Vec<Self> {
        self.element_array("AXChildren")
    }

    fn windows(&self) -> Vec<Self> {
        self.element_array("AXWindows")
    }

    fn write_value(&self, value: &WriteValue) -> Result<(), AxError> {
        let attribute = CFString::from_static_string("AXValue");
        let code = match value {
            WriteValue::Number(n) => {
                let number = CFNumber::from(*n);
                unsafe {
                    AXUIElementSetAttributeValue(
                        self.raw(),
                        attribute.as_concrete_TypeRef(),
                        number.as_CFTypeRef(),
                    )
                }
            }
            WriteValue::Text(s) => {
                let text = CFString::new(s);
                unsafe {
                    AXUIElementSetAttributeValue(
                        self.raw(),
                        attribute.as_concrete_TypeRef(),
                        text.as_CFTypeRef(),
                    )
                }
            }
        };

        match code {
            AX_SUCCESS => Ok(()),
            AX_ATTRIBUTE_UNSUPPORTED => Err(AxError::ControlNotWritable {
                role: self.role().map(|r| r.to_string()).unwrap_or_default(),
            }),
            AX_API_DISABLED => Err(AxError::PermissionDenied),
            code => Err(AxError::Api {
                code,
                message: "AXUIElementSetAttributeValue failed".to_string(),
            }),
        }
    }
}

/// The running host application, looked up by process name.
#[derive(Debug, Clone)]
pub struct LiveHost {
    process_name: String,
    messaging_timeout: f32,
}

impl LiveHost {
    pub fn new(process_name: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            process_name: process_name.into(),
            messaging_timeout: timeout_ms as f32 / 1000.0,
        }
    }

    fn pid(&self) -> Result<i32, AxError> {
        let output = Command::new("pgrep")
            .arg("-x")
            .arg(&self.process_name)
            .output()
            .map_err(|e| AxError::Api {
                code: 0,
                message: format!("pgrep: {}", e),
            })?;
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .find_map(|line| line.trim().parse::<i32>().ok())
            .ok_or_else(|| AxError::HostNotRunning(self.process_name.clone()))
    }
}

impl Host for LiveHost {
    type Element = AxElement;

    fn check_access(&self) -> Result<bool, AxError> {
        Ok(unsafe { AXIsProcessTrusted() } != 0)
    }

    fn application(&self) -> Result<AxElement, AxError> {
        let pid = self.pid()?;
        debug!(pid, process = %self.process_name, "attaching to host");
        let raw = unsafe { AXUIElementCreateApplication(pid) };
        if raw.is_null() {
            return Err(AxError::HostNotRunning(self.process_name.clone()));
        }
        let app = AxElement(unsafe { CFType::wrap_under_create_rule(raw) });
        unsafe { AXUIElementSetMessagingTimeout(app.raw(), self.messaging_timeout) };
        Ok(app)
    }
}
