// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All tensor math lives in this layer. The domain layer never
// sees a Burn type.
//
// What's in this layer:
//
//   cell.rs       — GRU cell and a stack of them behind the
//                   RecurrentCell trait
//
//   encoder.rs    — Reads the L inputs, produces L+1 annotations
//                   (zero sentinel first)
//
//   attention.rs  — Additive attention used as a pointer:
//                   one logit per annotation
//
//   decoder.rs    — L+1 pointing steps, teacher-forced or
//                   fed with its own arg-max
//
//   loss.rs       — Stable log-softmax cross-entropy and
//                   sequence-level exact matches
//
//   model.rs      — PointerNetwork: encoder + decoder, training
//                   loss and evaluation metrics
//
//   trainer.rs    — Trainer (model, Adam, learning rate, step)
//                   and the step loop with checkpointing
//
//   inferencer.rs — Sorter: loads a checkpoint and sorts a list
//
// Reference: Vinyals et al. (2015) Pointer Networks
//            Burn Book §3 (Building Blocks), §5 (Training)

/// GRU cells
pub mod cell;

/// Annotation encoder
pub mod encoder;

/// Pointer attention scorer
pub mod attention;

/// Teacher-forced and self-fed decoding
pub mod decoder;

/// Loss and sequence accuracy
pub mod loss;

/// The pointer network
pub mod model;

/// Training loop
pub mod trainer;

/// Inference on one list
pub mod inferencer;
