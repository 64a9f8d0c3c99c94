use serde::{Deserialize, Serialize};

/// Number of students shown per list page
pub const PAGE_SIZE: u32 = 10;

/// Server-assigned student identifier
pub type StudentId = u64;

/// Full student record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
  pub id: StudentId,
  #[serde(flatten)]
  pub fields: StudentDraft,
}

impl Student {
  pub fn summary(&self) -> StudentSummary {
    StudentSummary {
      id: self.id,
      avatar: self.fields.avatar.clone(),
      last_name: self.fields.last_name.clone(),
      email: self.fields.email.clone(),
    }
  }
}

/// A student without an id: creation payload and form state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentDraft {
  #[serde(default)]
  pub first_name: String,
  #[serde(default)]
  pub last_name: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub country: String,
  #[serde(default)]
  pub gender: String,
  #[serde(default)]
  pub avatar: String,
  #[serde(default)]
  pub btc_address: String,
}

impl StudentDraft {
  /// Attach a server id, producing an update payload
  pub fn with_id(self, id: StudentId) -> Student {
    Student { id, fields: self }
  }

  pub fn field(&self, field: Field) -> &str {
    match field {
      Field::Email => &self.email,
      Field::Gender => &self.gender,
      Field::Country => &self.country,
      Field::FirstName => &self.first_name,
      Field::LastName => &self.last_name,
      Field::Avatar => &self.avatar,
      Field::BtcAddress => &self.btc_address,
    }
  }

  pub fn field_mut(&mut self, field: Field) -> &mut String {
    match field {
      Field::Email => &mut self.email,
      Field::Gender => &mut self.gender,
      Field::Country => &mut self.country,
      Field::FirstName => &mut self.first_name,
      Field::LastName => &mut self.last_name,
      Field::Avatar => &mut self.avatar,
      Field::BtcAddress => &mut self.btc_address,
    }
  }
}

/// Row projection returned by the list endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentSummary {
  pub id: StudentId,
  #[serde(default)]
  pub avatar: String,
  #[serde(default)]
  pub last_name: String,
  #[serde(default)]
  pub email: String,
}

/// One page of the student collection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentPage {
  pub students: Vec<StudentSummary>,
  /// Total number of students across all pages
  pub total: u64,
}

impl StudentPage {
  /// Number of pages needed to show `total` students
  pub fn page_count(&self) -> u32 {
    page_count(self.total)
  }
}

pub fn page_count(total: u64) -> u32 {
  total.div_ceil(PAGE_SIZE as u64) as u32
}

/// Editable student fields, in form order. The wire name doubles as the key
/// of server validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
  Email,
  Gender,
  Country,
  FirstName,
  LastName,
  Avatar,
  BtcAddress,
}

impl Field {
  pub const ALL: [Field; 7] = [
    Field::Email,
    Field::Gender,
    Field::Country,
    Field::FirstName,
    Field::LastName,
    Field::Avatar,
    Field::BtcAddress,
  ];

  pub fn name(self) -> &'static str {
    match self {
      Field::Email => "email",
      Field::Gender => "gender",
      Field::Country => "country",
      Field::FirstName => "first_name",
      Field::LastName => "last_name",
      Field::Avatar => "avatar",
      Field::BtcAddress => "btc_address",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Field::Email => "Email address",
      Field::Gender => "Gender",
      Field::Country => "Country",
      Field::FirstName => "First Name",
      Field::LastName => "Last Name",
      Field::Avatar => "Avatar Base64",
      Field::BtcAddress => "BTC Address",
    }
  }
}

/// Choices offered for the gender field
pub const GENDERS: &[&str] = &["male", "female", "other"];
