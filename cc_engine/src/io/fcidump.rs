//! FCIDUMP reader for restricted closed-shell integrals.
//!
//! The header is a Fortran namelist (`&FCI NORB=.., NELEC=.., MS2=..,
//! UHF=.. &END`, also closed by `/` or `$END`). Every following line is
//! `value i j k l` with 1-based orbital indices:
//!
//! - `i j k l > 0`: two-electron integral `(ij|kl)`
//! - `i j 0 0`: one-electron integral `h_ij`
//! - `i 0 0 0`: orbital energy, ignored
//! - `0 0 0 0`: core energy

use crate::error::{CcError, Result};
use crate::integrals::SpatialIntegrals;
use std::fs;
use std::path::Path;
use tensor::Tensor;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FcidumpHeader {
    pub norb: usize,
    pub nelec: usize,
    pub ms2: usize,
    pub uhf: bool,
}

fn is_header_end(line: &str) -> bool {
    let upper = line.trim().to_ascii_uppercase();
    upper == "/" || upper == "$" || upper.ends_with("&END") || upper.ends_with("$END")
}

/// Integer assigned to `key` in a namelist, e.g. `NORB= 4`.
fn namelist_value(text: &str, key: &str) -> Option<usize> {
    text.match_indices(key).find_map(|(at, _)| {
        let preceded_by_word = text[..at]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_alphanumeric());
        if preceded_by_word {
            return None;
        }
        let rest = text[at + key.len()..].trim_start().strip_prefix('=')?;
        let digits: String = rest
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    })
}

fn parse_error(path: &Path, line: usize, reason: impl Into<String>) -> CcError {
    CcError::Parse {
        path: path.to_path_buf(),
        line,
        reason: reason.into(),
    }
}

fn parse_value(token: &str) -> Option<f64> {
    token.replace(['D', 'd'], "E").parse().ok()
}

pub fn parse_header(content: &str, path: &Path) -> Result<(FcidumpHeader, usize)> {
    let mut text = String::new();
    for (number, line) in content.lines().enumerate() {
        text.push_str(&line.to_ascii_uppercase());
        text.push(' ');
        if is_header_end(line) {
            let header = FcidumpHeader {
                norb: namelist_value(&text, "NORB")
                    .ok_or_else(|| parse_error(path, number + 1, "header has no NORB"))?,
                nelec: namelist_value(&text, "NELEC")
                    .ok_or_else(|| parse_error(path, number + 1, "header has no NELEC"))?,
                ms2: namelist_value(&text, "MS2").unwrap_or(0),
                uhf: namelist_value(&text, "UHF").unwrap_or(0) != 0,
            };
            debug!("FCIDUMP header ends at line {}", number + 1);
            return Ok((header, number + 1));
        }
    }
    Err(parse_error(path, content.lines().count(), "header is not terminated"))
}

/// Parses FCIDUMP text; `nelec` overrides the header's electron count.
pub fn parse_fcidump(content: &str, path: &Path, nelec: Option<usize>) -> Result<SpatialIntegrals> {
    let (header, body_start) = parse_header(content, path)?;
    if header.uhf {
        return Err(parse_error(path, body_start, "UHF integrals are not supported"));
    }
    if header.ms2 != 0 {
        return Err(parse_error(
            path,
            body_start,
            format!("MS2={} is not a closed shell", header.ms2),
        ));
    }
    let n = header.norb;
    if n == 0 {
        return Err(parse_error(path, body_start, "NORB must be positive"));
    }

    let mut h = Tensor::zeros("h", &[n, n]);
    let mut eri = Tensor::zeros("eri", &[n, n, n, n]);
    let mut core_energy = 0.0;
    let mut count = 0usize;

    for (offset, line) in content.lines().skip(body_start).enumerate() {
        let number = body_start + offset + 1;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() != 5 {
            return Err(parse_error(path, number, "expected a value and four indices"));
        }
        let value = parse_value(tokens[0])
            .ok_or_else(|| parse_error(path, number, format!("bad value {:?}", tokens[0])))?;
        let mut idx = [0usize; 4];
        for (slot, token) in idx.iter_mut().zip(&tokens[1..]) {
            *slot = token
                .parse()
                .map_err(|_| parse_error(path, number, format!("bad index {token:?}")))?;
            if *slot > n {
                return Err(parse_error(
                    path,
                    number,
                    format!("index {slot} exceeds NORB={n}"),
                ));
            }
        }

        match idx {
            [0, 0, 0, 0] => core_energy = value,
            [p, q, 0, 0] if p > 0 && q > 0 => {
                h.set(&[p - 1, q - 1], value)?;
                h.set(&[q - 1, p - 1], value)?;
            }
            [_, 0, 0, 0] => {}
            [p, q, r, s] if p > 0 && q > 0 && r > 0 && s > 0 => {
                let (p, q, r, s) = (p - 1, q - 1, r - 1, s - 1);
                for target in [
                    [p, q, r, s],
                    [q, p, r, s],
                    [p, q, s, r],
                    [q, p, s, r],
                    [r, s, p, q],
                    [s, r, p, q],
                    [r, s, q, p],
                    [s, r, q, p],
                ] {
                    eri.set(&target, value)?;
                }
            }
            _ => {
                return Err(parse_error(
                    path,
                    number,
                    format!("unexpected index pattern {idx:?}"),
                ))
            }
        }
        count += 1;
    }

    let n_electrons = nelec.unwrap_or(header.nelec);
    info!(
        "FCIDUMP: {} orbitals, {} electrons, {} integral lines",
        n, n_electrons, count
    );
    SpatialIntegrals::new(n_electrons, core_energy, h, eri)
}

pub fn read_fcidump(path: impl AsRef<Path>, nelec: Option<usize>) -> Result<SpatialIntegrals> {
    let path = path.as_ref();
    info!("Reading FCIDUMP from {}", path.display());
    let content = fs::read_to_string(path).map_err(|source| CcError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_fcidump(&content, path, nelec)
}
