//! CCM* with AES-128 and a 2-octet length field.
//!
//! Authentication runs CBC-MAC over `B0 | L(a) | a | pad | m | pad`,
//! encryption is CTR mode with `A_i = flags | nonce | i`, and the MIC is the
//! CBC-MAC tag encrypted with `A_0`. A MIC length of zero skips
//! authentication.

use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes128;

use crate::frame::SecurityLevel;

pub const KEY_LEN: usize = 16;
pub const NONCE_LEN: usize = 13;
const BLOCK_LEN: usize = 16;

/// Build the nonce from the extended source address (most significant octet
/// first), the frame counter and the security level.
pub fn nonce(source: &[u8; 8], frame_counter: u32, level: SecurityLevel) -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    nonce[..8].copy_from_slice(source);
    nonce[8..12].copy_from_slice(&frame_counter.to_be_bytes());
    nonce[12] = level as u8;
    nonce
}

struct CbcMac<'c> {
    cipher: &'c Aes128,
    state: [u8; BLOCK_LEN],
    pos: usize,
}

impl<'c> CbcMac<'c> {
    fn new(cipher: &'c Aes128, b0: [u8; BLOCK_LEN]) -> Self {
        let mut mac = Self {
            cipher,
            state: b0,
            pos: BLOCK_LEN,
        };
        mac.block();
        mac
    }

    fn block(&mut self) {
        let mut block = GenericArray::from(self.state);
        self.cipher.encrypt_block(&mut block);
        self.state.copy_from_slice(&block);
        self.pos = 0;
    }

    fn update(&mut self, data: &[u8]) {
        for byte in data {
            self.state[self.pos] ^= byte;
            self.pos += 1;
            if self.pos == BLOCK_LEN {
                self.block();
            }
        }
    }

    /// Zero padding up to the block boundary.
    fn pad(&mut self) {
        if self.pos > 0 {
            self.block();
        }
    }
}

fn counter_block(cipher: &Aes128, nonce: &[u8; NONCE_LEN], i: u16) -> [u8; BLOCK_LEN] {
    let mut a = [0u8; BLOCK_LEN];
    a[0] = 0x01;
    a[1..14].copy_from_slice(nonce);
    a[14..].copy_from_slice(&i.to_be_bytes());
    let mut block = GenericArray::from(a);
    cipher.encrypt_block(&mut block);
    block.into()
}

fn tag(cipher: &Aes128, nonce: &[u8; NONCE_LEN], a: &[u8], m: &[u8], mic_len: usize) -> [u8; BLOCK_LEN] {
    let mut b0 = [0u8; BLOCK_LEN];
    b0[0] = ((!a.is_empty() as u8) << 6) | ((((mic_len as u8).saturating_sub(2)) / 2) << 3) | 0x01;
    b0[1..14].copy_from_slice(nonce);
    b0[14..].copy_from_slice(&(m.len() as u16).to_be_bytes());

    let mut mac = CbcMac::new(cipher, b0);
    if !a.is_empty() {
        mac.update(&(a.len() as u16).to_be_bytes());
        mac.update(a);
        mac.pad();
    }
    mac.update(m);
    mac.pad();
    mac.state
}

fn ctr(cipher: &Aes128, nonce: &[u8; NONCE_LEN], m: &mut [u8]) {
    for (i, chunk) in m.chunks_mut(BLOCK_LEN).enumerate() {
        let s = counter_block(cipher, nonce, i as u16 + 1);
        for (byte, key) in chunk.iter_mut().zip(s.iter()) {
            *byte ^= key;
        }
    }
}

/// Authenticate `a` and `m`, encrypt `m` in place and write the MIC into
/// `mic`, whose length selects the MIC length (0, 4, 8 or 16).
pub fn encrypt(key: &[u8; KEY_LEN], nonce: &[u8; NONCE_LEN], a: &[u8], m: &mut [u8], mic: &mut [u8]) {
    let cipher = Aes128::new(&GenericArray::from(*key));
    if !mic.is_empty() {
        let t = tag(&cipher, nonce, a, m, mic.len());
        let s0 = counter_block(&cipher, nonce, 0);
        for (i, byte) in mic.iter_mut().enumerate() {
            *byte = t[i] ^ s0[i];
        }
    }
    ctr(&cipher, nonce, m);
}

/// Decrypt `m` in place and check `mic`. Returns `false` when the MIC does
/// not match, `m` then holds garbage.
pub fn decrypt(key: &[u8; KEY_LEN], nonce: &[u8; NONCE_LEN], a: &[u8], m: &mut [u8], mic: &[u8]) -> bool {
    let cipher = Aes128::new(&GenericArray::from(*key));
    ctr(&cipher, nonce, m);
    if mic.is_empty() {
        return true;
    }
    let t = tag(&cipher, nonce, a, m, mic.len());
    let s0 = counter_block(&cipher, nonce, 0);
    mic.iter()
        .enumerate()
        .fold(0u8, |diff, (i, byte)| diff | (byte ^ t[i] ^ s0[i]))
        == 0
}
