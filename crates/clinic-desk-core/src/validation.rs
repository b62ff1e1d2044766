//! Registration form validation.

use std::collections::BTreeMap;

use crate::models::{Gender, NewPatient};

pub const FULL_NAME_REQUIRED: &str = "Full Name is mandatory.";
pub const AGE_INVALID: &str = "Please enter a valid age.";
pub const PHONE_REQUIRED: &str = "Phone Number is mandatory.";
pub const PHONE_FORMAT: &str = "Phone number must be exactly 10 digits.";
pub const ADDRESS_REQUIRED: &str = "Residential address is mandatory.";

/// Form fields that carry validation messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    FullName,
    Age,
    Phone,
    Address,
}

/// Field to message. Empty means the draft is valid.
pub type FieldErrors = BTreeMap<Field, String>;

/// Raw registration input as typed at the desk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientDraft {
    pub full_name: String,
    pub age: String,
    pub gender: Gender,
    pub phone: String,
    pub address: String,
}

impl PatientDraft {
    /// Build the registration request, or the errors blocking it.
    pub fn to_request(&self) -> Result<NewPatient, FieldErrors> {
        let errors = validate(self);
        let age = match parse_age(&self.age) {
            Some(age) if errors.is_empty() => age,
            _ => return Err(errors),
        };

        Ok(NewPatient {
            full_name: self.full_name.trim().to_string(),
            age,
            gender: self.gender,
            phone: self.phone.clone(),
            address: self.address.trim().to_string(),
        })
    }
}

/// Check every field and collect the messages for those that fail.
pub fn validate(draft: &PatientDraft) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if draft.full_name.trim().is_empty() {
        errors.insert(Field::FullName, FULL_NAME_REQUIRED.into());
    }

    if parse_age(&draft.age).is_none() {
        errors.insert(Field::Age, AGE_INVALID.into());
    }

    if draft.phone.trim().is_empty() {
        errors.insert(Field::Phone, PHONE_REQUIRED.into());
    } else if !is_ten_digits(&draft.phone) {
        errors.insert(Field::Phone, PHONE_FORMAT.into());
    }

    if draft.address.trim().is_empty() {
        errors.insert(Field::Address, ADDRESS_REQUIRED.into());
    }

    errors
}

fn parse_age(raw: &str) -> Option<f64> {
    let age: f64 = raw.trim().parse().ok()?;
    (age.is_finite() && age > 0.0).then_some(age)
}

fn is_ten_digits(phone: &str) -> bool {
    phone.len() == 10 && phone.bytes().all(|b| b.is_ascii_digit())
}
