//! Writing previews and views to disk.

use std::fs;
use std::path::{Path, PathBuf};

use restyle_pipeline::{EncodedImage, StyleCandidate, ViewResult, codec};

use crate::CliError;

/// Lowercase, dash-separated file stem for a free-form style name.
pub fn file_stem(name: &str) -> String {
    let mut stem = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            stem.push(c.to_ascii_lowercase());
        } else if !stem.is_empty() && !stem.ends_with('-') {
            stem.push('-');
        }
    }
    while stem.ends_with('-') {
        stem.pop();
    }
    if stem.is_empty() {
        stem.push_str("style");
    }
    stem
}

fn write_image(dir: &Path, stem: &str, image: &EncodedImage) -> Result<PathBuf, CliError> {
    let path = dir.join(format!("{stem}.{}", image.extension()));
    let bytes = image.to_bytes().map_err(|source| CliError::Payload {
        path: path.clone(),
        source,
    })?;
    fs::write(&path, bytes).map_err(|source| CliError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn ensure_dir(dir: &Path) -> Result<(), CliError> {
    fs::create_dir_all(dir).map_err(|source| CliError::Write {
        path: dir.to_path_buf(),
        source,
    })
}

/// Write every candidate preview as `previews/{n}-{name}.{ext}`.
pub fn write_previews(out_dir: &Path, candidates: &[StyleCandidate]) -> Result<Vec<PathBuf>, CliError> {
    let dir = out_dir.join("previews");
    ensure_dir(&dir)?;
    candidates
        .iter()
        .enumerate()
        .map(|(i, candidate)| {
            let stem = format!("{}-{}", i + 1, file_stem(&candidate.name));
            write_image(&dir, &stem, &candidate.preview)
        })
        .collect()
}

/// Write each view as `{label}.{ext}`, plus the canonical description.
pub fn write_views(
    out_dir: &Path,
    views: &[ViewResult],
    canonical_description: Option<&str>,
) -> Result<Vec<PathBuf>, CliError> {
    ensure_dir(out_dir)?;
    let mut written = views
        .iter()
        .map(|view| write_image(out_dir, view.label.slug(), &view.image))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(description) = canonical_description {
        let path = out_dir.join("description.txt");
        fs::write(&path, description).map_err(|source| CliError::Write {
            path: path.clone(),
            source,
        })?;
        written.push(path);
    }
    Ok(written)
}

/// Write `views.html`, a single page with every view inlined as a data URI.
pub fn write_gallery(out_dir: &Path, style: &str, views: &[ViewResult]) -> Result<PathBuf, CliError> {
    ensure_dir(out_dir)?;
    let mut html = format!(
        "<!doctype html>\n<meta charset=\"utf-8\">\n<title>{0}</title>\n<h1>{0}</h1>\n",
        escape_html(style)
    );
    for view in views {
        let label = view.label.label();
        html.push_str(&format!(
            "<figure><img src=\"{}\" alt=\"{label}\"><figcaption>{label}</figcaption></figure>\n",
            codec::decode(&view.image)
        ));
    }
    let path = out_dir.join("views.html");
    fs::write(&path, html).map_err(|source| CliError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
