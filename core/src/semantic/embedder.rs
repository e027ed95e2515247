//! semantic/embedder.rs
//! Embedding generators.
//!
//! Failures are recoverable: ingest stores the chunk without an embedding
//! and search skips it.

use std::fmt;
use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::constants::DEFAULT_EMBEDDING_DIMS;

#[derive(Debug)]
pub enum EmbedError {
    EmptyInput,
    InvalidDims(usize),
    /// Model produced a zero or non-finite vector.
    Degenerate,
    Process(String),
    Parse(String),
}

impl fmt::Display for EmbedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbedError::EmptyInput => write!(f, "nothing to embed"),
            EmbedError::InvalidDims(d) => write!(f, "invalid embedding dimensionality: {}", d),
            EmbedError::Degenerate => write!(f, "embedding is zero or not finite"),
            EmbedError::Process(msg) => write!(f, "embedding process failed: {}", msg),
            EmbedError::Parse(msg) => write!(f, "embedding output unparsable: {}", msg),
        }
    }
}

impl std::error::Error for EmbedError {}

pub trait Embedder: Send + Sync {
    /// Embed one raw chunk.
    fn embed(&self, chunk: &[u8]) -> Result<Vec<f32>, EmbedError>;

    /// Embed a free-text query into the same space.
    fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.embed(text.as_bytes())
    }
}

/// Deterministic feature-hashing embedder.
///
/// Lowercased alphanumeric tokens are hashed with BLAKE3 into `dims` signed
/// buckets and the vector is L2-normalized, so cosine and dot product agree.
/// Chunks without any token (binary data) fall back to 4-byte shingles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingEmbedder {
    dims: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self { dims: DEFAULT_EMBEDDING_DIMS }
    }
}

impl HashingEmbedder {
    pub fn new(dims: usize) -> Result<Self, EmbedError> {
        if dims == 0 {
            return Err(EmbedError::InvalidDims(dims));
        }
        Ok(Self { dims })
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    fn bump(&self, v: &mut [f32], feature: &[u8]) {
        let hash = blake3::hash(feature);
        let bytes = hash.as_bytes();
        let mut word = [0u8; 8];
        word.copy_from_slice(&bytes[..8]);
        let bucket = (u64::from_le_bytes(word) % self.dims as u64) as usize;
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
        v[bucket] += sign;
    }
}

fn tokens(data: &[u8]) -> impl Iterator<Item = Vec<u8>> + '_ {
    data.split(|b| !b.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
}

pub(crate) fn l2_normalize(v: &mut [f32]) -> Result<(), EmbedError> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return Err(EmbedError::Degenerate);
    }
    v.iter_mut().for_each(|x| *x /= norm);
    Ok(())
}

impl Embedder for HashingEmbedder {
    fn embed(&self, chunk: &[u8]) -> Result<Vec<f32>, EmbedError> {
        if chunk.is_empty() {
            return Err(EmbedError::EmptyInput);
        }

        let mut v = vec![0.0f32; self.dims];
        let mut seen = 0usize;
        for token in tokens(chunk) {
            self.bump(&mut v, &token);
            seen += 1;
        }
        if seen == 0 {
            for shingle in chunk.chunks(4) {
                self.bump(&mut v, shingle);
            }
        }

        l2_normalize(&mut v)?;
        Ok(v)
    }
}

/// How `ProcessEmbedder` hands the base64-encoded chunk to the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbedInput {
    /// Written to stdin; no size limit beyond the pipe.
    #[default]
    Stdin,
    /// Appended as the last argument, for scripts that read `argv[1]`.
    /// Large chunks can exceed the platform's argument length limit.
    Argv,
}

/// Runs an external model per chunk. The chunk is base64-encoded and passed
/// per `input`; the child prints a JSON array of floats on stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEmbedder {
    pub program: String,
    pub args: Vec<String>,
    pub input: EmbedInput,
}

impl ProcessEmbedder {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            input: EmbedInput::default(),
        }
    }

    pub fn with_input(mut self, input: EmbedInput) -> Self {
        self.input = input;
        self
    }

    fn run(&self, input: &[u8]) -> Result<Vec<f32>, EmbedError> {
        if input.is_empty() {
            return Err(EmbedError::EmptyInput);
        }
        let encoded = BASE64.encode(input);

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).stdout(Stdio::piped()).stderr(Stdio::piped());
        match self.input {
            EmbedInput::Stdin => cmd.stdin(Stdio::piped()),
            EmbedInput::Argv => cmd.arg(&encoded).stdin(Stdio::null()),
        };
        let mut child = cmd
            .spawn()
            .map_err(|e| EmbedError::Process(format!("spawn {}: {}", self.program, e)))?;

        let output = match self.input {
            EmbedInput::Argv => child.wait_with_output(),
            EmbedInput::Stdin => {
                let mut stdin = child
                    .stdin
                    .take()
                    .ok_or_else(|| EmbedError::Process("child stdin unavailable".into()))?;

                // stdin is fed from a second thread while stdout is drained here.
                // A child that exits without reading all input is judged by its
                // exit status, not by the broken pipe.
                thread::scope(|s| {
                    let writer = s.spawn(move || stdin.write_all(encoded.as_bytes()));
                    let output = child.wait_with_output();
                    let _ = writer.join();
                    output
                })
            }
        }
        .map_err(|e| EmbedError::Process(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EmbedError::Process(format!("{}: {}", output.status, stderr.trim())));
        }

        let v: Vec<f32> = serde_json::from_slice(&output.stdout)
            .map_err(|e| EmbedError::Parse(e.to_string()))?;
        if v.is_empty() {
            return Err(EmbedError::Parse("empty embedding".into()));
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(EmbedError::Degenerate);
        }
        Ok(v)
    }
}

impl Embedder for ProcessEmbedder {
    fn embed(&self, chunk: &[u8]) -> Result<Vec<f32>, EmbedError> {
        self.run(chunk)
    }
}
