//! Reconciliation: merge candidates from every attempt into one record.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use crate::models::{BillField, CanonicalRecord, FieldCandidate, FieldKey, ProviderId};

/// Per-field arbitration between candidates of different providers.
///
/// The outcome depends only on the candidate set, never on its order:
/// candidates are ranked by effective score, then provider priority, then
/// earliest match span, then value text.
#[derive(Debug, Clone)]
pub struct Reconciler {
    priority: Vec<ProviderId>,
    epsilon: f32,
}

struct Scored {
    candidate: FieldCandidate,
    effective: f32,
    value_text: String,
}

impl Reconciler {
    pub fn new(priority: Vec<ProviderId>, epsilon: f32) -> Self {
        Self { priority, epsilon }
    }

    /// Rank of a provider: listed providers by position, unlisted ones after
    /// them ordered by identifier.
    fn rank<'a>(&self, provider_id: &'a str) -> (usize, &'a str) {
        match self.priority.iter().position(|p| p == provider_id) {
            Some(index) => (index, ""),
            None => (self.priority.len(), provider_id),
        }
    }

    fn compare(&self, a: &Scored, b: &Scored) -> Ordering {
        b.effective
            .total_cmp(&a.effective)
            .then_with(|| {
                self.rank(&a.candidate.source_provider_id)
                    .cmp(&self.rank(&b.candidate.source_provider_id))
            })
            .then_with(|| a.candidate.raw_match_span.cmp(&b.candidate.raw_match_span))
            .then_with(|| a.value_text.cmp(&b.value_text))
            .then_with(|| a.candidate.rule.cmp(b.candidate.rule))
    }

    /// Build the partial record: fields, per-field confidence and winners.
    ///
    /// `qualities` maps provider id to attempt quality; providers missing from
    /// it count as quality 0.
    pub fn reconcile(
        &self,
        document_id: &str,
        candidates: Vec<FieldCandidate>,
        qualities: &BTreeMap<ProviderId, f32>,
    ) -> CanonicalRecord {
        let mut record = CanonicalRecord::empty(document_id);

        let mut groups: BTreeMap<FieldKey, Vec<Scored>> = BTreeMap::new();
        for candidate in candidates {
            let quality = qualities
                .get(&candidate.source_provider_id)
                .copied()
                .unwrap_or(0.0);
            let effective = (candidate.local_confidence * quality).clamp(0.0, 1.0);
            let value_text = candidate.value.to_string();
            groups.entry(candidate.field.clone()).or_default().push(Scored {
                candidate,
                effective,
                value_text,
            });
        }

        let mut wins: BTreeMap<ProviderId, usize> = BTreeMap::new();

        for (key, mut group) in groups {
            group.sort_by(|a, b| self.compare(a, b));
            let winner = &group[0];

            if let Some(rival) = group.iter().skip(1).find(|s| {
                winner.effective - s.effective <= self.epsilon
                    && s.candidate.source_provider_id != winner.candidate.source_provider_id
                    && s.candidate.value != winner.candidate.value
            }) {
                debug!(field = %key, "Providers disagree");
                record.errors.push(format!(
                    "ambiguous {}: chose {:?} from {} ({:.2}) over {:?} from {} ({:.2})",
                    key,
                    winner.value_text,
                    winner.candidate.source_provider_id,
                    winner.effective,
                    rival.value_text,
                    rival.candidate.source_provider_id,
                    rival.effective,
                ));
            }

            let provider = winner.candidate.source_provider_id.clone();
            *wins.entry(provider.clone()).or_default() += 1;
            record.field_confidence.insert(key.clone(), winner.effective);
            record.winning_provider_per_field.insert(key.clone(), provider);
            record.fields.insert(key, winner.candidate.value.clone());
        }

        for field in BillField::ALL {
            record
                .field_confidence
                .entry(FieldKey::Known(*field))
                .or_insert(0.0);
        }

        record.primary_provider = self.primary_provider(&wins, qualities);
        record
    }

    /// The provider that won the most fields, or failing that the best
    /// successful attempt. Ties go to the higher-priority provider.
    fn primary_provider(
        &self,
        wins: &BTreeMap<ProviderId, usize>,
        qualities: &BTreeMap<ProviderId, f32>,
    ) -> Option<ProviderId> {
        let by_wins = wins
            .iter()
            .min_by(|(a, na), (b, nb)| nb.cmp(na).then_with(|| self.rank(a).cmp(&self.rank(b))))
            .map(|(id, _)| id.clone());

        by_wins.or_else(|| {
            qualities
                .iter()
                .filter(|(_, q)| **q > 0.0)
                .min_by(|(a, qa), (b, qb)| {
                    qb.total_cmp(qa).then_with(|| self.rank(a).cmp(&self.rank(b)))
                })
                .map(|(id, _)| id.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldValue, MatchSpan};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn candidate(field: BillField, value: &str, provider: &str, conf: f32, start: usize) -> FieldCandidate {
        FieldCandidate {
            field: FieldKey::Known(field),
            value: FieldValue::Text(value.to_string()),
            source_provider_id: provider.to_string(),
            local_confidence: conf,
            raw_match_span: MatchSpan::text(0, start, start + value.len()),
            rule: "test",
        }
    }

    fn qualities(pairs: &[(&str, f32)]) -> BTreeMap<ProviderId, f32> {
        pairs.iter().map(|(id, q)| (id.to_string(), *q)).collect()
    }

    fn reconciler() -> Reconciler {
        Reconciler::new(vec!["pdf_extract".into(), "lopdf".into()], 0.05)
    }

    #[test]
    fn test_highest_effective_score_wins() {
        let candidates = vec![
            candidate(BillField::NumeroFattura, "FT1", "pdf_extract", 0.95, 0),
            candidate(BillField::NumeroFattura, "FT2", "lopdf", 0.95, 0),
        ];
        let record = reconciler().reconcile(
            "doc.pdf",
            candidates,
            &qualities(&[("pdf_extract", 0.5), ("lopdf", 1.0)]),
        );

        let key = FieldKey::Known(BillField::NumeroFattura);
        assert_eq!(record.fields[&key], FieldValue::Text("FT2".into()));
        assert_eq!(record.winning_provider_per_field[&key], "lopdf");
        assert!((record.field_confidence[&key] - 0.95).abs() < 1e-6);
        assert!(record.errors.is_empty());
    }

    #[test]
    fn test_priority_breaks_ties_and_records_ambiguity() {
        let candidates = vec![
            candidate(BillField::CodiceCliente, "B", "lopdf", 0.9, 0),
            candidate(BillField::CodiceCliente, "A", "pdf_extract", 0.9, 10),
        ];
        let record = reconciler().reconcile(
            "doc.pdf",
            candidates,
            &qualities(&[("pdf_extract", 0.8), ("lopdf", 0.8)]),
        );

        let key = FieldKey::Known(BillField::CodiceCliente);
        assert_eq!(record.fields[&key], FieldValue::Text("A".into()));
        assert_eq!(record.errors.len(), 1);
        assert!(record.errors[0].starts_with("ambiguous codice_cliente"));
    }

    #[test]
    fn test_agreeing_providers_are_not_ambiguous() {
        let candidates = vec![
            candidate(BillField::CodicePdr, "12345678901234", "lopdf", 0.95, 0),
            candidate(BillField::CodicePdr, "12345678901234", "pdf_extract", 0.95, 0),
        ];
        let record = reconciler().reconcile(
            "doc.pdf",
            candidates,
            &qualities(&[("pdf_extract", 1.0), ("lopdf", 1.0)]),
        );
        assert!(record.errors.is_empty());
        assert_eq!(
            record.winning_provider_per_field[&FieldKey::Known(BillField::CodicePdr)],
            "pdf_extract"
        );
    }

    #[test]
    fn test_unlisted_provider_ranks_last() {
        let candidates = vec![
            candidate(BillField::ClienteNome, "Anna", "zeta", 0.8, 0),
            candidate(BillField::ClienteNome, "Mario", "lopdf", 0.8, 5),
        ];
        let record = reconciler().reconcile(
            "doc.pdf",
            candidates,
            &qualities(&[("zeta", 1.0), ("lopdf", 1.0)]),
        );
        assert_eq!(record.get(BillField::ClienteNome), Some(&FieldValue::Text("Mario".into())));
    }

    #[test]
    fn test_earliest_span_breaks_same_provider_ties() {
        let candidates = vec![
            candidate(BillField::ClienteCitta, "Roma", "lopdf", 0.85, 40),
            candidate(BillField::ClienteCitta, "Milano", "lopdf", 0.85, 12),
        ];
        let record = reconciler().reconcile("d", candidates, &qualities(&[("lopdf", 1.0)]));
        assert_eq!(record.get(BillField::ClienteCitta), Some(&FieldValue::Text("Milano".into())));
        assert!(record.errors.is_empty());
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let mut candidates = vec![
            candidate(BillField::NumeroFattura, "FT1", "pdf_extract", 0.9, 3),
            candidate(BillField::NumeroFattura, "FT2", "lopdf", 0.9, 1),
            candidate(BillField::ClienteNome, "Mario", "lopdf", 0.85, 0),
            candidate(BillField::ClienteNome, "Maria", "plain_text", 0.85, 0),
        ];
        let q = qualities(&[("pdf_extract", 0.7), ("lopdf", 0.7), ("plain_text", 0.7)]);
        let forward = reconciler().reconcile("d", candidates.clone(), &q);
        candidates.reverse();
        let backward = reconciler().reconcile("d", candidates, &q);

        assert_eq!(forward.fields, backward.fields);
        assert_eq!(forward.winning_provider_per_field, backward.winning_provider_per_field);
        assert_eq!(forward.errors, backward.errors);
        assert_eq!(forward.primary_provider, backward.primary_provider);
    }

    #[test]
    fn test_absent_fields_have_zero_confidence() {
        let amount = FieldCandidate {
            field: FieldKey::Known(BillField::ImportoTotale),
            value: FieldValue::Decimal(Decimal::from_str("99.62").unwrap()),
            source_provider_id: "lopdf".into(),
            local_confidence: 0.95,
            raw_match_span: MatchSpan::text(0, 0, 5),
            rule: "total_due",
        };
        let record = reconciler().reconcile("d", vec![amount], &qualities(&[("lopdf", 1.0)]));

        assert_eq!(record.fields.len(), 1);
        assert_eq!(record.confidence_of(&FieldKey::Known(BillField::CodicePdr)), 0.0);
        assert_eq!(record.field_confidence.len(), BillField::ALL.len());
        assert_eq!(record.primary_provider.as_deref(), Some("lopdf"));
    }

    #[test]
    fn test_primary_provider_falls_back_to_best_attempt() {
        let record = reconciler().reconcile(
            "d",
            Vec::new(),
            &qualities(&[("pdf_extract", 0.3), ("lopdf", 0.6), ("plain_text", 0.0)]),
        );
        assert!(record.fields.is_empty());
        assert_eq!(record.primary_provider.as_deref(), Some("lopdf"));
    }
}
