mod kaniko;

pub use kaniko::KanikoBackend;
