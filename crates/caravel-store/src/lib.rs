//! The Caravel package store.
//!
//! Packages live under `<store>/<name>/<version>/` with the original zip
//! archive kept alongside the extracted tree so the recorded sha can be
//! recomputed at any time. Installs stream archive bytes through a sha512
//! hasher into a process-unique temp directory and rename into place; the
//! first writer wins and losers observe the completed directory.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod archive;
mod checksum;
mod error;
mod install;
mod layout;
mod package;

pub use archive::extract_zip;
pub use checksum::{Sha512Hasher, sha512_base64, sha512_base64_file};
pub use error::{Result, StoreError};
pub use install::{InstallOutcome, PackageInstaller};
pub use layout::PackageStore;
pub use package::{InstalledPackage, PACKAGE_METADATA_FILE, PackageMetadata};
