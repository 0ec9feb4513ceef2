use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Copy)]
#[serde(rename_all = "lowercase")]
pub enum FaceShape {
    Round,
    Square,
    Oval,
    Heart,
    Oblong,
}

impl std::fmt::Display for FaceShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FaceShape::Round => "round",
            FaceShape::Square => "square",
            FaceShape::Oval => "oval",
            FaceShape::Heart => "heart",
            FaceShape::Oblong => "oblong",
        };
        write!(f, "{}", name)
    }
}

// Structured face-shape assessment returned by the analysis service.
// Produced once per captured photo and immutable afterwards; discarded when
// the user restarts capture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Analysis {
    pub face_shape: FaceShape,
    pub recommended_frame_shapes: Vec<String>,
    pub recommended_frame_sizes: Vec<String>,
    pub recommended_frame_colors: Vec<String>,
    pub reasoning: String,
}
