use std::cmp::Ordering;

use tracing::{debug, trace};

use crate::dns::{DNSPacket, Name, Nsec, enums::DNSResourceType};
use crate::error::{ProveError, Result};

use super::rrset::SignedRecordSet;

/// Whether the NSEC at `owner` proves that `(qname, qtype)` does not exist.
///
/// `apex` is the zone the NSEC belongs to (its RRSIG signer). Either the NSEC
/// sits at `qname` and its bitmap lacks both `qtype` and CNAME, or `qname` or
/// one of its ancestors below the apex falls strictly between `owner` and the
/// next name. The last NSEC of a zone has `next <= owner` and covers every
/// name after `owner`.
pub fn nsec_covers(owner: &Name, nsec: &Nsec, apex: &Name, qname: &Name, qtype: DNSResourceType) -> bool {
    if owner == qname {
        return !nsec.has_type(qtype) && !nsec.has_type(DNSResourceType::CNAME);
    }

    let mut candidate = Some(qname.clone());
    while let Some(name) = candidate {
        if name == *apex || !name.is_subdomain_of(apex) {
            break;
        }
        if name_in_gap(owner, &nsec.next_domain, &name) {
            trace!("{} falls between {} and {}", name, owner, nsec.next_domain);
            return true;
        }
        candidate = name.parent();
    }
    false
}

/// Strictly between `owner` and `next` in canonical order, wrapping when
/// `next` does not sort after `owner`.
fn name_in_gap(owner: &Name, next: &Name, name: &Name) -> bool {
    let after_owner = owner.canonical_cmp(name) == Ordering::Less;
    if owner.canonical_cmp(next) == Ordering::Less {
        after_owner && name.canonical_cmp(next) == Ordering::Less
    } else {
        after_owner
    }
}

/// Find the signed NSEC set in the authority section of `response` that
/// denies `(qname, qtype)`.
///
/// Returns `Ok(None)` when the section carries no NSEC at all. NSEC records
/// that cover nothing yield `AmbiguousDenial`; a covering NSEC without a
/// signature is a malformed response.
pub fn find_denial(
    response: &DNSPacket,
    qname: &Name,
    qtype: DNSResourceType,
) -> Result<Option<SignedRecordSet>> {
    let mut owners: Vec<&Name> = Vec::new();
    for rr in response
        .authorities
        .iter()
        .filter(|rr| rr.rtype == DNSResourceType::NSEC)
    {
        if !owners.contains(&&rr.name) {
            owners.push(&rr.name);
        }
    }
    if owners.is_empty() {
        return Ok(None);
    }

    for owner in owners {
        let Some(signed) = SignedRecordSet::from_section(&response.authorities, owner, DNSResourceType::NSEC)
        else {
            continue;
        };
        let Some(nsec) = signed.rrset.nsec() else {
            continue;
        };
        // An unsigned NSEC has no known apex
        let apex = signed.signer().cloned().unwrap_or_else(Name::root);
        if !nsec_covers(owner, nsec, &apex, qname, qtype) {
            continue;
        }
        if !signed.is_signed() {
            return Err(ProveError::MalformedResponse(format!(
                "NSEC at {} has no covering RRSIG",
                owner
            )));
        }
        debug!(%qname, %owner, next = %nsec.next_domain, "NSEC denial found");
        return Ok(Some(signed));
    }

    Err(ProveError::AmbiguousDenial { name: qname.clone() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    fn nsec(next: &str, types: &[DNSResourceType]) -> Nsec {
        Nsec {
            next_domain: name(next),
            types: types.to_vec(),
        }
    }

    #[test]
    fn test_name_in_gap() {
        assert!(name_in_gap(&name("a.example.com"), &name("c.example.com"), &name("b.example.com")));
        assert!(!name_in_gap(&name("a.example.com"), &name("c.example.com"), &name("d.example.com")));
        // Endpoints are not covered
        assert!(!name_in_gap(&name("a.example.com"), &name("c.example.com"), &name("c.example.com")));
        assert!(!name_in_gap(&name("a.example.com"), &name("c.example.com"), &name("a.example.com")));
        // Last NSEC wraps to the apex
        assert!(name_in_gap(&name("x.example.com"), &name("example.com"), &name("z.example.com")));
        assert!(!name_in_gap(&name("x.example.com"), &name("example.com"), &name("b.example.com")));
    }

    #[test]
    fn test_root_nsec_covers_missing_tld() {
        let denial = nsec("d", &[DNSResourceType::NS, DNSResourceType::SOA, DNSResourceType::TXT]);
        assert!(nsec_covers(&name("a"), &denial, &Name::root(), &name("b"), DNSResourceType::TXT));
        assert!(nsec_covers(&name("a"), &denial, &Name::root(), &name("x.b"), DNSResourceType::A));
        assert!(!nsec_covers(&name("a"), &denial, &Name::root(), &name("e"), DNSResourceType::TXT));
    }

    #[test]
    fn test_type_denial_at_owner() {
        let denial = nsec("d", &[DNSResourceType::NS, DNSResourceType::SOA, DNSResourceType::TXT]);
        assert!(nsec_covers(&name("a"), &denial, &Name::root(), &name("a"), DNSResourceType::A));
        assert!(!nsec_covers(&name("a"), &denial, &Name::root(), &name("a"), DNSResourceType::TXT));

        let with_cname = nsec("d", &[DNSResourceType::CNAME]);
        assert!(!nsec_covers(&name("a"), &with_cname, &Name::root(), &name("a"), DNSResourceType::A));
    }

    #[test]
    fn test_ancestor_covered_below_apex_only() {
        let zone = name("example.com");
        let denial = nsec("c.example.com", &[DNSResourceType::A]);
        // b.example.com does not exist, so nothing below it does either
        assert!(nsec_covers(
            &name("a.example.com"),
            &denial,
            &zone,
            &name("x.b.example.com"),
            DNSResourceType::A
        ));
        // The apex itself is never a candidate
        assert!(!nsec_covers(
            &name("x.example.com"),
            &nsec("example.com", &[]),
            &zone,
            &name("a.example.com"),
            DNSResourceType::A
        ));
    }
}
