// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Id-based lookup over a diagnostic-data document.
//!
//! Building the index checks that every id used by the engine resolves uniquely, so stages
//! can resolve references without re-checking.

use crate::diagnostic::{
    CertificateData, DiagnosticData, ObjectKind, ObjectRef, RevocationData, SignatureData,
    TimestampData,
};
use crate::error::ModelError;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct DiagnosticIndex<'a> {
    data: &'a DiagnosticData,
    signatures: BTreeMap<&'a str, &'a SignatureData>,
    certificates: BTreeMap<&'a str, &'a CertificateData>,
    revocations: BTreeMap<&'a str, (&'a RevocationData, &'a CertificateData)>,
    timestamps: BTreeMap<&'a str, (&'a TimestampData, &'a SignatureData)>,
}

impl<'a> DiagnosticIndex<'a> {
    pub fn build(data: &'a DiagnosticData) -> Result<Self, ModelError> {
        let mut certificates = BTreeMap::new();
        let mut revocations = BTreeMap::new();
        for cert in &data.certificates {
            if certificates.insert(cert.id.as_str(), cert).is_some() {
                return Err(ModelError::DuplicateId {
                    kind: "certificate",
                    id: cert.id.clone(),
                });
            }
            if let Some(rev) = &cert.revocation {
                if revocations.insert(rev.id.as_str(), (rev, cert)).is_some() {
                    return Err(ModelError::DuplicateId {
                        kind: "revocation",
                        id: rev.id.clone(),
                    });
                }
            }
        }

        let mut signatures = BTreeMap::new();
        let mut timestamps = BTreeMap::new();
        for sig in &data.signatures {
            if signatures.insert(sig.id.as_str(), sig).is_some() {
                return Err(ModelError::DuplicateId {
                    kind: "signature",
                    id: sig.id.clone(),
                });
            }
            for ts in &sig.timestamps {
                if timestamps.insert(ts.id.as_str(), (ts, sig)).is_some() {
                    return Err(ModelError::DuplicateId {
                        kind: "timestamp",
                        id: ts.id.clone(),
                    });
                }
            }
        }

        let index = Self {
            data,
            signatures,
            certificates,
            revocations,
            timestamps,
        };
        index.check_references()?;
        Ok(index)
    }

    fn check_references(&self) -> Result<(), ModelError> {
        for sig in &self.data.signatures {
            let owner = format!("signature {}", sig.id);
            self.check_certificate_ids(&owner, &sig.certificate_chain)?;
            if let Some(id) = &sig.signing_certificate.id {
                self.check_certificate_ids(&owner, std::slice::from_ref(id))?;
            }

            for ts in &sig.timestamps {
                let owner = format!("timestamp {}", ts.id);
                self.check_certificate_ids(&owner, &ts.certificate_chain)?;
                if let Some(id) = &ts.signing_certificate.id {
                    self.check_certificate_ids(&owner, std::slice::from_ref(id))?;
                }
                for obj in &ts.covered_objects {
                    if !self.contains(obj) {
                        return Err(ModelError::DanglingReference {
                            owner,
                            kind: kind_name(obj.kind),
                            id: obj.id.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn check_certificate_ids(&self, owner: &str, ids: &[String]) -> Result<(), ModelError> {
        match ids.iter().find(|id| !self.certificates.contains_key(id.as_str())) {
            Some(id) => Err(ModelError::DanglingReference {
                owner: owner.to_string(),
                kind: "certificate",
                id: id.clone(),
            }),
            None => Ok(()),
        }
    }

    pub fn data(&self) -> &'a DiagnosticData {
        self.data
    }

    pub fn signature(&self, id: &str) -> Option<&'a SignatureData> {
        self.signatures.get(id).copied()
    }

    pub fn certificate(&self, id: &str) -> Option<&'a CertificateData> {
        self.certificates.get(id).copied()
    }

    /// Revocation record and the certificate it describes.
    pub fn revocation(&self, id: &str) -> Option<(&'a RevocationData, &'a CertificateData)> {
        self.revocations.get(id).copied()
    }

    /// Timestamp token and the signature it is attached to.
    pub fn timestamp(&self, id: &str) -> Option<(&'a TimestampData, &'a SignatureData)> {
        self.timestamps.get(id).copied()
    }

    /// Resolves a chain of certificate ids. Unknown ids were rejected by [`Self::build`].
    pub fn chain(&self, ids: &[String]) -> Vec<&'a CertificateData> {
        ids.iter().filter_map(|id| self.certificate(id)).collect()
    }

    pub fn contains(&self, obj: &ObjectRef) -> bool {
        match obj.kind {
            ObjectKind::Signature => self.signatures.contains_key(obj.id.as_str()),
            ObjectKind::Certificate => self.certificates.contains_key(obj.id.as_str()),
            ObjectKind::Revocation => self.revocations.contains_key(obj.id.as_str()),
            ObjectKind::Timestamp => self.timestamps.contains_key(obj.id.as_str()),
        }
    }
}

fn kind_name(kind: ObjectKind) -> &'static str {
    match kind {
        ObjectKind::Signature => "signature",
        ObjectKind::Certificate => "certificate",
        ObjectKind::Revocation => "revocation",
        ObjectKind::Timestamp => "timestamp",
    }
}
