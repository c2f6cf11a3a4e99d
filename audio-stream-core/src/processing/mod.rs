pub mod pcm_convert;
pub mod voice_gate;
pub mod wav_format;
