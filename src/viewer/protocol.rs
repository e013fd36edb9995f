//! Wire format for viewer events.
//!
//! Each message is one self-contained binary frame: a one-byte event code
//! followed by little-endian payload fields. Counts and dimensions are `i32`,
//! vertex coordinates `f32`, pixels `u8`. Four image panes share one payload
//! layout and differ only in event code.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use nalgebra::Vector3;
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame truncated: {0}")]
    Truncated(#[from] std::io::Error),

    #[error("unknown event code {0}")]
    UnknownEventCode(u8),

    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}

/// One byte at the head of every frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum EventCode {
    InitObject = 0,
    UpdateObject = 1,
    InitImageArea = 2,
    UpdateTopLeftImage = 3,
    UpdateTopRightImage = 4,
    UpdateBottomLeftImage = 5,
    UpdateBottomRightImage = 6,
}

impl EventCode {
    fn from_u8(code: u8) -> Result<Self, ProtocolError> {
        Ok(match code {
            0 => Self::InitObject,
            1 => Self::UpdateObject,
            2 => Self::InitImageArea,
            3 => Self::UpdateTopLeftImage,
            4 => Self::UpdateTopRightImage,
            5 => Self::UpdateBottomLeftImage,
            6 => Self::UpdateBottomRightImage,
            other => return Err(ProtocolError::UnknownEventCode(other)),
        })
    }
}

/// Which of the four viewer canvases an image frame targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImagePane {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ImagePane {
    fn event_code(self) -> EventCode {
        match self {
            Self::TopLeft => EventCode::UpdateTopLeftImage,
            Self::TopRight => EventCode::UpdateTopRightImage,
            Self::BottomLeft => EventCode::UpdateBottomLeftImage,
            Self::BottomRight => EventCode::UpdateBottomRightImage,
        }
    }
}

/// A decoded viewer event.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    /// Full scene description: vertex positions plus face index triples.
    InitObject {
        vertices: Vec<Vector3<f32>>,
        faces: Vec<[u32; 3]>,
    },
    /// Replacement vertex positions for the already-initialized scene.
    UpdateObject { vertices: Vec<Vector3<f32>> },
    /// Canvas dimensions for the image panes.
    InitImageArea { width: u32, height: u32 },
    /// A grayscale frame for one pane, row-major, one byte per pixel.
    UpdateImage {
        pane: ImagePane,
        height: u32,
        width: u32,
        pixels: Vec<u8>,
    },
}

impl Message {
    /// Serialize into one wire frame.
    pub fn encode(&self) -> Vec<u8> {
        // Writes to a Vec cannot fail.
        let mut buf = Vec::new();
        match self {
            Self::InitObject { vertices, faces } => {
                buf.push(EventCode::InitObject as u8);
                let _ = buf.write_i32::<LittleEndian>(vertices.len() as i32);
                for v in vertices {
                    let _ = buf.write_f32::<LittleEndian>(v.x);
                    let _ = buf.write_f32::<LittleEndian>(v.y);
                    let _ = buf.write_f32::<LittleEndian>(v.z);
                }
                let _ = buf.write_i32::<LittleEndian>(faces.len() as i32);
                for f in faces {
                    for &vi in f {
                        let _ = buf.write_i32::<LittleEndian>(vi as i32);
                    }
                }
            }
            Self::UpdateObject { vertices } => {
                buf.push(EventCode::UpdateObject as u8);
                let _ = buf.write_i32::<LittleEndian>(vertices.len() as i32);
                for v in vertices {
                    let _ = buf.write_f32::<LittleEndian>(v.x);
                    let _ = buf.write_f32::<LittleEndian>(v.y);
                    let _ = buf.write_f32::<LittleEndian>(v.z);
                }
            }
            Self::InitImageArea { width, height } => {
                buf.push(EventCode::InitImageArea as u8);
                let _ = buf.write_i32::<LittleEndian>(*width as i32);
                let _ = buf.write_i32::<LittleEndian>(*height as i32);
            }
            Self::UpdateImage {
                pane,
                height,
                width,
                pixels,
            } => {
                buf.push(pane.event_code() as u8);
                let _ = buf.write_i32::<LittleEndian>(pixels.len() as i32);
                let _ = buf.write_i32::<LittleEndian>(*height as i32);
                let _ = buf.write_i32::<LittleEndian>(*width as i32);
                buf.extend_from_slice(pixels);
            }
        }
        buf
    }

    /// Parse one wire frame.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let mut cur = Cursor::new(frame);
        let code = EventCode::from_u8(cur.read_u8()?)?;
        match code {
            EventCode::InitObject => {
                let vertices = read_vertices(&mut cur)?;
                let num_faces = read_count(&mut cur, "face count")?;
                let mut faces = Vec::with_capacity(num_faces);
                for _ in 0..num_faces {
                    let mut tri = [0u32; 3];
                    for slot in &mut tri {
                        let vi = cur.read_i32::<LittleEndian>()?;
                        if vi < 0 {
                            return Err(ProtocolError::InvalidFrame(format!(
                                "negative face index {vi}"
                            )));
                        }
                        *slot = vi as u32;
                    }
                    faces.push(tri);
                }
                Ok(Self::InitObject { vertices, faces })
            }
            EventCode::UpdateObject => Ok(Self::UpdateObject {
                vertices: read_vertices(&mut cur)?,
            }),
            EventCode::InitImageArea => {
                let width = read_count(&mut cur, "width")? as u32;
                let height = read_count(&mut cur, "height")? as u32;
                Ok(Self::InitImageArea { width, height })
            }
            EventCode::UpdateTopLeftImage
            | EventCode::UpdateTopRightImage
            | EventCode::UpdateBottomLeftImage
            | EventCode::UpdateBottomRightImage => {
                let pane = match code {
                    EventCode::UpdateTopLeftImage => ImagePane::TopLeft,
                    EventCode::UpdateTopRightImage => ImagePane::TopRight,
                    EventCode::UpdateBottomLeftImage => ImagePane::BottomLeft,
                    _ => ImagePane::BottomRight,
                };
                let num_pixels = read_count(&mut cur, "pixel count")?;
                let height = read_count(&mut cur, "height")? as u32;
                let width = read_count(&mut cur, "width")? as u32;
                if num_pixels != (height as usize) * (width as usize) {
                    return Err(ProtocolError::InvalidFrame(format!(
                        "{num_pixels} pixels for a {width}x{height} image"
                    )));
                }
                let mut pixels = vec![0u8; num_pixels];
                std::io::Read::read_exact(&mut cur, &mut pixels)?;
                Ok(Self::UpdateImage {
                    pane,
                    height,
                    width,
                    pixels,
                })
            }
        }
    }
}

fn read_count(cur: &mut Cursor<&[u8]>, what: &str) -> Result<usize, ProtocolError> {
    let n = cur.read_i32::<LittleEndian>()?;
    if n < 0 {
        return Err(ProtocolError::InvalidFrame(format!("negative {what}: {n}")));
    }
    Ok(n as usize)
}

fn read_vertices(cur: &mut Cursor<&[u8]>) -> Result<Vec<Vector3<f32>>, ProtocolError> {
    let n = read_count(cur, "vertex count")?;
    let mut vertices = Vec::with_capacity(n);
    for _ in 0..n {
        let x = cur.read_f32::<LittleEndian>()?;
        let y = cur.read_f32::<LittleEndian>()?;
        let z = cur.read_f32::<LittleEndian>()?;
        vertices.push(Vector3::new(x, y, z));
    }
    Ok(vertices)
}
