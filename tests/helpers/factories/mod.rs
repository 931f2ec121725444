mod candidate_factory;
mod descriptor_factory;
mod segment_factory;

pub use candidate_factory::CandidateFactory;
pub use descriptor_factory::DescriptorFactory;
pub use segment_factory::SegmentFactory;
