//! Batch conversion: one personalized CPI per customer from a shared PPF.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::domain::{ConversionItem, ConversionResult, CpiFailure, CpiSuccess, PpfData};
use crate::error::{PackError, Result};
use crate::formats::cpi::build_encrypted_cpi;
use crate::formats::n27::parse_n27;
use crate::formats::ppf::parse_ppf;
use crate::store::{BufferSink, BufferSource};

/// Install id stamped into every generated CPI header.
const PACK_INSTALL_ID: u32 = 1;

/// Replace anything outside `[A-Za-z0-9._-]` so the version label is safe
/// in a filename.
fn sanitize_version(version: &str) -> String {
    version
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Generate one CPI per item from a shared PPF source.
///
/// The PPF is fetched and parsed once; each item is then converted
/// independently on the rayon pool (the parsed pack is shared read-only).
/// A single item's failure — missing identity file, unextractable model
/// name, any fetch/parse/encrypt/store error — is recorded as a
/// [`CpiFailure`] and never aborts its siblings. Both result lists preserve
/// the relative input order of their items.
///
/// Errors only when the shared PPF itself cannot be fetched.
pub fn generate_cpis(
    source: &dyn BufferSource,
    sink: &dyn BufferSink,
    ppf_ref: &str,
    version: &str,
    items: &[ConversionItem],
    batch_ref: &str,
) -> Result<ConversionResult> {
    let ppf_bytes = source.fetch(ppf_ref)?;
    let pack = parse_ppf(&ppf_bytes);
    debug!(
        ppf = ppf_ref,
        blobs = pack.blobs.len(),
        items = items.len(),
        "starting cpi batch"
    );

    let outcomes: Vec<(i64, Result<CpiSuccess>)> = items
        .par_iter()
        .map(|item| (item.id, convert_one(source, sink, &pack, version, batch_ref, item)))
        .collect();

    let mut result = ConversionResult::default();
    for (customer_id, outcome) in outcomes {
        match outcome {
            Ok(success) => result.successful.push(success),
            Err(err) => {
                warn!(customer = customer_id, error = %err, "cpi generation failed");
                result.failed.push(CpiFailure {
                    customer_id,
                    error: err.to_string(),
                });
            }
        }
    }

    debug!(
        ok = result.successful.len(),
        failed = result.failed.len(),
        "cpi batch finished"
    );
    Ok(result)
}

fn convert_one(
    source: &dyn BufferSource,
    sink: &dyn BufferSink,
    pack: &PpfData,
    version: &str,
    batch_ref: &str,
    item: &ConversionItem,
) -> Result<CpiSuccess> {
    let identity_ref = item
        .identity_ref
        .as_deref()
        .ok_or(PackError::MissingIdentity)?;

    let n27_bytes = source.fetch(identity_ref)?;
    let n27_name = identity_ref.rsplit('/').next().unwrap_or("unknown.n27");
    let info = parse_n27(&n27_bytes, n27_name);

    if info.name.is_empty() {
        return Err(PackError::Format(
            "cannot extract model name from instrument identity file".to_string(),
        ));
    }

    // Device-lock when the instrument reports an identity string; an absent
    // fullId produces the standard (universal) CSEC.
    let full_id = (!info.full_id.is_empty()).then_some(info.full_id.as_str());
    let cpi = build_encrypted_cpi(pack, &info.name, PACK_INSTALL_ID, None, full_id)?;

    let file_ref = item
        .external_ref
        .clone()
        .unwrap_or_else(|| item.id.to_string());
    let file_name = format!("{file_ref}_{}.cpi", sanitize_version(version));
    let path = format!("updates/{batch_ref}/cpi/{file_name}");

    let output_ref = sink.store(&path, &cpi)?;
    debug!(customer = item.id, model = %info.name, locked = full_id.is_some(), "cpi stored");

    Ok(CpiSuccess {
        customer_id: item.id,
        output_ref,
        model_name: info.name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::writer::{build_chunk, build_container_chunk, build_text_chunk, concat};
    use crate::formats::cpi::split_cpi;
    use crate::formats::ppf::PPF_HEADER_LEN;
    use crate::store::MemStore;

    fn seed_ppf(store: &MemStore) {
        let blob = build_container_chunk(
            b"BLOB",
            &[
                build_text_chunk(b"EUID", "b1"),
                build_text_chunk(b"ETIT", "Sample"),
                build_text_chunk(b"EEXT", "wav"),
                build_chunk(b"FBIN", &[1, 2, 3]),
            ],
        );
        let mut buf = vec![0u8; PPF_HEADER_LEN];
        buf.extend_from_slice(&concat(&[
            build_text_chunk(b"EUID", "ABC123"),
            build_text_chunk(b"ETIT", "Test Pack"),
            blob,
        ]));
        store.insert("source.ppf", buf);
    }

    fn seed_n27(store: &MemStore, reference: &str, name: &str, full_id: &str) {
        let mut buf = vec![0u8; 0x90];
        buf[..name.len()].copy_from_slice(name.as_bytes());
        buf[88..88 + full_id.len()].copy_from_slice(full_id.as_bytes());
        store.insert(reference, buf);
    }

    fn item(id: i64, external: Option<&str>, identity: Option<&str>) -> ConversionItem {
        ConversionItem {
            id,
            external_ref: external.map(str::to_string),
            identity_ref: identity.map(str::to_string),
        }
    }

    #[test]
    fn batch_partial_failure_keeps_siblings() {
        let store = MemStore::new();
        seed_ppf(&store);
        seed_n27(&store, "infos/c1.n27", "Genos", "E1GC0000001");
        seed_n27(&store, "infos/c3.n27", "SX900", "");

        let items = [
            item(1, Some("CUST-1"), Some("infos/c1.n27")),
            item(2, Some("CUST-2"), None),
            item(3, None, Some("infos/c3.n27")),
        ];

        let result = generate_cpis(&store, &store, "source.ppf", "V5", &items, "batch-9").unwrap();

        assert_eq!(result.successful.len(), 2);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].customer_id, 2);
        assert!(result.failed[0].error.contains("identity"));
    }

    #[test]
    fn output_naming_and_storage_path() {
        let store = MemStore::new();
        seed_ppf(&store);
        seed_n27(&store, "infos/c1.n27", "Genos", "E1GC0000001");

        let items = [item(1, Some("CUST-1"), Some("infos/c1.n27"))];
        let result = generate_cpis(&store, &store, "source.ppf", "V5 (rc)", &items, "b1").unwrap();

        assert_eq!(result.successful.len(), 1);
        let success = &result.successful[0];
        assert_eq!(success.output_ref, "updates/b1/cpi/CUST-1_V5__rc_.cpi");
        assert_eq!(success.model_name, "Genos");
        assert!(store.get(&success.output_ref).is_some());
    }

    #[test]
    fn external_ref_falls_back_to_numeric_id() {
        let store = MemStore::new();
        seed_ppf(&store);
        seed_n27(&store, "infos/c7.n27", "Genos", "");

        let items = [item(7, None, Some("infos/c7.n27"))];
        let result = generate_cpis(&store, &store, "source.ppf", "V1", &items, "b").unwrap();
        assert_eq!(result.successful[0].output_ref, "updates/b/cpi/7_V1.cpi");
    }

    #[test]
    fn unreadable_model_name_is_an_itemized_failure() {
        let store = MemStore::new();
        seed_ppf(&store);
        store.insert("infos/blank.n27", vec![0u8; 64]);

        let items = [item(4, None, Some("infos/blank.n27"))];
        let result = generate_cpis(&store, &store, "source.ppf", "V1", &items, "b").unwrap();
        assert!(result.successful.is_empty());
        assert_eq!(result.failed.len(), 1);
        assert!(result.failed[0].error.contains("model name"));
    }

    #[test]
    fn missing_identity_blob_is_an_itemized_failure() {
        let store = MemStore::new();
        seed_ppf(&store);

        let items = [item(5, None, Some("infos/ghost.n27"))];
        let result = generate_cpis(&store, &store, "source.ppf", "V1", &items, "b").unwrap();
        assert_eq!(result.failed.len(), 1);
        assert!(result.failed[0].error.contains("ghost"));
    }

    #[test]
    fn empty_full_id_produces_standard_csec_not_an_error() {
        let store = MemStore::new();
        seed_ppf(&store);
        seed_n27(&store, "infos/c1.n27", "Genos", "");

        let items = [item(1, Some("C"), Some("infos/c1.n27"))];
        let result = generate_cpis(&store, &store, "source.ppf", "V1", &items, "b").unwrap();
        assert_eq!(result.successful.len(), 1);

        let cpi = store.get(&result.successful[0].output_ref).unwrap();
        let sections = split_cpi(&cpi).unwrap();
        assert_eq!(sections.csec, &crate::crypto::lock::CSEC_STANDARD[..]);
    }

    #[test]
    fn locked_and_standard_csec_diverge_within_one_batch() {
        let store = MemStore::new();
        seed_ppf(&store);
        seed_n27(&store, "infos/locked.n27", "Genos", "E1GC0000001");
        seed_n27(&store, "infos/open.n27", "Genos", "");

        let items = [
            item(1, Some("L"), Some("infos/locked.n27")),
            item(2, Some("O"), Some("infos/open.n27")),
        ];
        let result = generate_cpis(&store, &store, "source.ppf", "V1", &items, "b").unwrap();
        assert_eq!(result.successful.len(), 2);

        let locked = store.get("updates/b/cpi/L_V1.cpi").unwrap();
        let open = store.get("updates/b/cpi/O_V1.cpi").unwrap();
        let locked_sections = split_cpi(&locked).unwrap();
        let open_sections = split_cpi(&open).unwrap();
        assert_ne!(locked_sections.csec, open_sections.csec);
        // Payload encryption is independent of the device lock.
        assert_eq!(locked_sections.payload, open_sections.payload);
    }

    #[test]
    fn missing_ppf_fails_the_whole_batch() {
        let store = MemStore::new();
        let items = [item(1, None, Some("x"))];
        assert!(generate_cpis(&store, &store, "absent.ppf", "V1", &items, "b").is_err());
    }

    #[test]
    fn sanitize_version_replaces_unsafe_chars() {
        assert_eq!(sanitize_version("V5.1_rc-2"), "V5.1_rc-2");
        assert_eq!(sanitize_version("V5 (beta)/×"), "V5__beta___");
    }
}
