use crate::error::{Error, Result};
use crate::network::Network;
use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use ndarray::Array2;
use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};
use tracing::info;

// Parameters are stored layer by layer, the weight matrix first and then the bias row. Each matrix
// is written as its row count and column count (little-endian i64s) followed by every entry in
// row-major order (little-endian f64s). The shapes are only used as a consistency check when
// reading: the network being loaded into must already have the same layer sizes.

pub fn write_parameters<W: Write>(network: &Network, mut writer: W) -> Result<()> {
    for (weight, bias) in network.weights.iter().zip(network.biases.iter()) {
        write_matrix(&mut writer, weight)?;
        write_matrix(&mut writer, bias)?;
    }
    writer.flush()?;
    Ok(())
}

// Overwrites the network's parameters with those read from the stream. If anything goes wrong
// part way through, the network keeps its previous parameters.
pub fn read_parameters<R: Read>(network: &mut Network, mut reader: R) -> Result<()> {
    let mut weights = Vec::with_capacity(network.weights.len());
    let mut biases = Vec::with_capacity(network.biases.len());

    for (layer, (weight, bias)) in network.weights.iter().zip(network.biases.iter()).enumerate() {
        weights.push(read_matrix(&mut reader, 2 * layer, weight.dim())?);
        biases.push(read_matrix(&mut reader, 2 * layer + 1, bias.dim())?);
    }

    network.weights = weights;
    network.biases = biases;
    Ok(())
}

fn write_matrix<W: Write>(writer: &mut W, matrix: &Array2<f64>) -> Result<()> {
    let (rows, columns) = matrix.dim();
    writer.write_all(&(rows as i64).to_le_bytes())?;
    writer.write_all(&(columns as i64).to_le_bytes())?;
    // Iterating an Array2 always visits elements in logical row-major order, whatever the memory
    // layout.
    for value in matrix.iter() {
        writer.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

fn read_matrix<R: Read>(
    reader: &mut R,
    index: usize,
    expected: (usize, usize),
) -> Result<Array2<f64>> {
    let rows = read_i64(reader)?;
    let columns = read_i64(reader)?;
    if rows != expected.0 as i64 || columns != expected.1 as i64 {
        return Err(Error::PersistedShapeMismatch {
            index,
            expected,
            found: (rows, columns),
        });
    }

    let mut bytes = vec![0u8; expected.0 * expected.1 * size_of::<f64>()];
    reader.read_exact(&mut bytes)?;
    let values = bytes
        .chunks_exact(size_of::<f64>())
        .map(|chunk| {
            let mut buffer = [0u8; size_of::<f64>()];
            buffer.copy_from_slice(chunk);
            f64::from_le_bytes(buffer)
        })
        .collect();

    Array2::from_shape_vec(expected, values).map_err(|_| Error::ShapeMismatch {
        what: "stored matrix",
        expected,
        found: (rows as usize, columns as usize),
    })
}

fn read_i64<R: Read>(reader: &mut R) -> Result<i64> {
    let mut buffer = [0u8; size_of::<i64>()];
    reader.read_exact(&mut buffer)?;
    Ok(i64::from_le_bytes(buffer))
}

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|extension| extension == "gz")
}

impl Network {
    /// Writes the network's weights and biases to `path`, replacing any existing file. Paths
    /// ending in `.gz` are gzip-compressed.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = BufWriter::new(File::create(path)?);
        if is_gzip(path) {
            let mut encoder = GzEncoder::new(file, Compression::default());
            write_parameters(self, &mut encoder)?;
            encoder.finish()?.flush()?;
        } else {
            write_parameters(self, file)?;
        }
        info!(path = %path.display(), "saved network parameters");
        Ok(())
    }

    /// Reads weights and biases previously written by [`Network::save`] into this network, which
    /// must have been created with the same layer sizes.
    pub fn load_into<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = BufReader::new(File::open(path)?);
        if is_gzip(path) {
            read_parameters(self, GzDecoder::new(file))?;
        } else {
            read_parameters(self, file)?;
        }
        info!(path = %path.display(), "loaded network parameters");
        Ok(())
    }
}
